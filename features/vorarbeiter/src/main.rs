use std::sync::{Arc, OnceLock};

use tracing_subscriber::EnvFilter;
use vorarbeiter::{
    create_service_container, create_service_spec_builder, new_context, Container, ResolveError,
    ScopeSlot, ServiceFactory, ServiceId, TraceLookups,
};

fn main() -> Result<(), ResolveError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let car_id = ServiceId::unique("car");

    let mut builder = create_service_spec_builder();
    builder.set_factory(&car_id, CarFactory);
    builder.set("driver", |_| Ok(Driver));
    builder.set("ctx", |_| Ok(ScopeSlot::new()));
    builder
        .set("myScopedService", |_| Ok(String::from("My scoped service")))
        .scoped_with(ScopeSlot::resolver("ctx"));
    let injector_car_id = car_id.clone();
    builder
        .set("injectorService", |_| Ok(InjectorService::default()))
        .with_injector(move |service, container| {
            let _ = service.car.set(container.get(&injector_car_id)?);
            service.set_driver(container.get("driver")?);
            Ok(())
        });
    builder.set("head", |container| {
        Ok(Head {
            head: "head",
            tail: container.get::<Tail>("tail")?.tail,
        })
    });
    builder
        .set("tail", |_| {
            Ok(Tail {
                head: OnceLock::new(),
                tail: "tail",
            })
        })
        .with_injector(|tail, container| {
            let _ = tail.head.set(container.get::<Head>("head")?.head);
            Ok(())
        });
    builder.add_service_middleware(TraceLookups);

    let container = create_service_container(builder.get_service_spec());

    let car = container.get::<Car>(&car_id)?;
    println!("{}", car.driver_name());

    let ctx = container.get::<ScopeSlot>("ctx")?;
    let (first, second) = ctx.run(new_context(), || {
        Ok::<_, ResolveError>((
            container.get::<String>("myScopedService")?,
            container.get::<String>("myScopedService")?,
        ))
    })?;
    println!("{first} {second} {}", Arc::ptr_eq(&first, &second));

    let (third, fourth) = ctx.run(new_context(), || {
        Ok::<_, ResolveError>((
            container.get::<String>("myScopedService")?,
            container.get::<String>("myScopedService")?,
        ))
    })?;
    println!("{first} {third} {}", Arc::ptr_eq(&first, &third));
    println!("{third} {fourth} {}", Arc::ptr_eq(&third, &fourth));

    let injector_service = container.get::<InjectorService>("injectorService")?;
    if let Some(car) = injector_service.car.get() {
        println!(
            "Get driver name from property set with property injection: {}",
            car.driver_name()
        );
    }
    if let Some(driver) = injector_service.driver.get() {
        println!(
            "Get driver name from property set with setter injection: {}",
            driver.name()
        );
    }

    println!("{:?}", container.get::<Tail>("tail")?);
    println!("{:?}", container);
    Ok(())
}

#[derive(Debug)]
struct Driver;
impl Driver {
    fn name(&self) -> &'static str {
        "Michael Schumacher"
    }
}

struct Car {
    driver: Arc<Driver>,
}
impl Car {
    fn driver_name(&self) -> &'static str {
        self.driver.name()
    }
}

struct CarFactory;
impl ServiceFactory for CarFactory {
    type Provides = Car;

    fn create(&self, container: &Container) -> Result<Car, ResolveError> {
        Ok(Car {
            driver: container.get("driver")?,
        })
    }
}

#[derive(Default)]
struct InjectorService {
    car: OnceLock<Arc<Car>>,
    driver: OnceLock<Arc<Driver>>,
}
impl InjectorService {
    fn set_driver(&self, driver: Arc<Driver>) {
        let _ = self.driver.set(driver);
    }
}

#[derive(Debug)]
struct Head {
    head: &'static str,
    #[allow(dead_code)]
    tail: &'static str,
}

#[derive(Debug)]
struct Tail {
    head: OnceLock<&'static str>,
    tail: &'static str,
}
