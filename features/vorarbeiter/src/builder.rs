use std::{
    collections::{hash_map::Entry, HashMap},
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    container::Container,
    definition::{Lifetime, ServiceDefinition, Specification},
    errors::ResolveError,
    factories::{
        ContextResolver, FnContextResolver, FnFactory, FnInjector, ServiceFactory, ServiceInjector,
    },
    middleware::{Lookup, Middleware},
    types::{Context, Injectable, ServiceId},
};

/// Collects service definitions and middlewares into a [`Specification`]
///
/// ```
/// use vorarbeiter::{create_service_container, create_service_spec_builder};
///
/// let mut builder = create_service_spec_builder();
/// builder.set("greeting", |_| Ok(String::from("Hello")));
/// builder
///     .set("counter", |_| Ok(std::sync::atomic::AtomicUsize::new(0)))
///     .transient();
///
/// let container = create_service_container(builder.get_service_spec());
/// assert_eq!(*container.get::<String>("greeting").unwrap(), "Hello");
/// ```
#[derive(Default)]
pub struct ServiceSpecBuilder {
    /// Registered definitions, last registration per id wins
    services: HashMap<ServiceId, ServiceDefinition>,
    /// Middlewares in registration order
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl ServiceSpecBuilder {
    pub fn new() -> Self {
        ServiceSpecBuilder {
            services: HashMap::new(),
            middlewares: Vec::new(),
        }
    }
}
impl ServiceSpecBuilder {
    /// Registers a shared service constructed by `factory`
    ///
    /// Registering an id twice replaces the earlier definition.
    pub fn set<T, F>(&mut self, id: impl Into<ServiceId>, factory: F) -> DefinitionBuilder<'_, T>
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.set_factory(id, FnFactory::new(factory))
    }

    /// Registers a shared service constructed by a [`ServiceFactory`] implementation
    pub fn set_factory<Factory: ServiceFactory>(
        &mut self,
        id: impl Into<ServiceId>,
        factory: Factory,
    ) -> DefinitionBuilder<'_, Factory::Provides> {
        let id = id.into();
        let definition = ServiceDefinition::new(Arc::new(factory));

        let definition = match self.services.entry(id) {
            Entry::Occupied(mut entry) => {
                tracing::debug!("Replacing definition of service {}", entry.key());
                entry.insert(definition);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(definition),
        };

        DefinitionBuilder {
            definition,
            _service: PhantomData,
        }
    }

    /// Appends a middleware, it will wrap all middlewares added before it
    pub fn add_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(Lookup) -> Lookup + Send + Sync + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends a [`Middleware`] implementation
    pub fn add_service_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends several middlewares, keeping their order
    pub fn add_middlewares<I>(&mut self, middlewares: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.middlewares.extend(middlewares);
        self
    }

    /// Snapshot of the current builder state
    ///
    /// Later changes to the builder do not affect the returned specification.
    pub fn get_service_spec(&self) -> Specification {
        tracing::debug!(
            "Building specification with {} services and {} middlewares",
            self.services.len(),
            self.middlewares.len()
        );
        Specification::new(self.services.clone(), self.middlewares.clone())
    }
}

/// Fluent configuration of a single registered service
pub struct DefinitionBuilder<'a, T: Injectable> {
    definition: &'a mut ServiceDefinition,
    _service: PhantomData<fn() -> T>,
}
impl<T: Injectable> DefinitionBuilder<'_, T> {
    /// One instance for the whole container, the default
    pub fn shared(self) -> Self {
        self.definition.lifetime = Lifetime::Shared;
        self
    }

    /// A new instance on every lookup
    pub fn transient(self) -> Self {
        self.definition.lifetime = Lifetime::Transient;
        self
    }

    /// One instance per context returned by `resolver`
    ///
    /// The resolver runs on every lookup and may itself use the container.
    pub fn scoped<F>(self, resolver: F) -> Self
    where
        F: Fn(&Container) -> Result<Context, ResolveError> + Send + Sync + 'static,
    {
        self.scoped_with(FnContextResolver(resolver))
    }

    pub fn scoped_with<R: ContextResolver>(self, resolver: R) -> Self {
        self.definition.lifetime = Lifetime::Scoped(Arc::new(resolver));
        self
    }

    /// Runs `injector` on every newly constructed instance, after it was cached
    ///
    /// The injector may look up the service it belongs to, which allows breaking cycles.
    pub fn with_injector<F>(self, injector: F) -> Self
    where
        F: Fn(&Arc<T>, &Container) -> Result<(), ResolveError> + Send + Sync + 'static,
    {
        self.with_service_injector(FnInjector::new(injector))
    }

    pub fn with_service_injector<I: ServiceInjector<Target = T>>(self, injector: I) -> Self {
        self.definition.injector = Some(Arc::new(injector));
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::scope::new_context;

    #[test]
    fn defaults_to_shared_without_injector() {
        let mut builder = ServiceSpecBuilder::new();
        builder.set("driver", |_| Ok(String::from("Michael Schumacher")));

        let spec = builder.get_service_spec();
        let definition = spec.get(&"driver".into()).unwrap();

        assert!(matches!(definition.lifetime(), Lifetime::Shared));
        assert!(!definition.has_injector());
        assert_eq!(definition.provides().type_name, std::any::type_name::<String>());
    }

    #[test]
    fn last_lifetime_call_wins() {
        let mut builder = ServiceSpecBuilder::new();
        builder
            .set("a", |_| Ok(1_u8))
            .transient()
            .scoped(|_| Ok(new_context()))
            .shared();
        builder
            .set("b", |_| Ok(2_u8))
            .shared()
            .scoped(|_| Ok(new_context()));
        builder.set("c", |_| Ok(3_u8)).scoped(|_| Ok(new_context())).transient();

        let spec = builder.get_service_spec();
        assert!(matches!(spec.get(&"a".into()).unwrap().lifetime(), Lifetime::Shared));
        assert!(matches!(spec.get(&"b".into()).unwrap().lifetime(), Lifetime::Scoped(_)));
        assert!(matches!(spec.get(&"c".into()).unwrap().lifetime(), Lifetime::Transient));
    }

    #[test]
    fn set_overwrites_previous_definition() {
        let mut builder = ServiceSpecBuilder::new();
        builder
            .set("service", |_| Ok(AtomicUsize::new(0)))
            .transient()
            .with_injector(|_, _| Ok(()));
        builder.set("service", |_| Ok(String::from("replaced")));

        let spec = builder.get_service_spec();
        let definition = spec.get(&"service".into()).unwrap();

        assert_eq!(spec.len(), 1);
        assert!(matches!(definition.lifetime(), Lifetime::Shared));
        assert!(!definition.has_injector());
        assert_eq!(definition.provides().type_name, std::any::type_name::<String>());
    }

    #[test]
    fn spec_is_a_snapshot() {
        let mut builder = ServiceSpecBuilder::new();
        builder.set("first", |_| Ok(1_u32));
        let spec = builder.get_service_spec();

        builder.set("second", |_| Ok(2_u32));
        builder.set("first", |_| Ok(1_u32)).transient();
        builder.add_middleware(|next| next);

        assert!(spec.has(&"first".into()));
        assert!(!spec.has(&"second".into()));
        assert!(spec.get(&"second".into()).is_none());
        assert!(matches!(spec.get(&"first".into()).unwrap().lifetime(), Lifetime::Shared));
        assert!(spec.middlewares().is_empty());
        assert_eq!(builder.get_service_spec().len(), 2);
    }
}
