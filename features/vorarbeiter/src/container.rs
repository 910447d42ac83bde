use std::{
    any::type_name,
    cell::RefCell,
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
};

use parking_lot::ReentrantMutex;

use crate::{
    definition::{Lifetime, ServiceDefinition, Specification},
    errors::ResolveError,
    middleware::{compose, lookup, Lookup},
    scope::ScopedInstances,
    types::{Context, Injectable, Instance, ServiceId},
};

/// Container lazily constructing and caching the services of a [`Specification`]
///
/// Cloning is cheap, all clones share the same cache.
#[derive(Clone)]
pub struct Container(Arc<ContainerInner>);
struct ContainerInner {
    spec: Specification,
    /// Middlewares wrapped around [`Container::resolve_service`]
    lookup: Lookup,
    /// Held by the outermost `get` for its whole call tree.
    /// The RefCell is only ever borrowed while no user code runs.
    state: ReentrantMutex<RefCell<ContainerState>>,
}

#[derive(Default)]
struct ContainerState {
    shared: HashMap<ServiceId, Instance>,
    scoped: HashMap<ServiceId, ScopedInstances>,
    /// Services whose factory is currently running, in entry order
    in_flight: Vec<ServiceId>,
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.0.state.lock();
        let state = guard.borrow();

        let mut map = f.debug_struct("Container");
        let mut ids: Vec<_> = self.0.spec.ids().collect();
        ids.sort();
        for id in ids {
            let val = if state.shared.contains_key(id) {
                "shared".to_string()
            } else if let Some(scoped) = state.scoped.get(id) {
                format!("scoped in {} contexts", scoped.len())
            } else {
                "not instantiated".to_string()
            };
            map.field(&id.to_string(), &val);
        }
        map.finish()
    }
}

impl Container {
    pub fn new(spec: Specification) -> Self {
        let core = lookup(|container, id| container.resolve_service(id));
        let lookup = compose(core, spec.middlewares());

        Self(Arc::new(ContainerInner {
            spec,
            lookup,
            state: ReentrantMutex::new(RefCell::new(ContainerState::default())),
        }))
    }

    /// Resolves the service registered as `id`
    ///
    /// Fails if the id is unknown, if constructing it requires itself,
    /// or if it was registered as a different type than `T`.
    pub fn get<T: Injectable>(&self, id: impl Into<ServiceId>) -> Result<Arc<T>, ResolveError> {
        let id = id.into();
        self.get_instance(&id)?
            .downcast::<T>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                id,
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    /// Resolves the service registered as `id` without downcasting it
    pub fn get_instance(&self, id: impl Into<ServiceId>) -> Result<Instance, ResolveError> {
        let id = id.into();
        let _lock = self.0.state.lock();
        (self.0.lookup)(self, &id)
    }

    /// Whether an instance of `id` was cached
    ///
    /// This reflects instantiation, not registration. Transient services are
    /// never cached. For scoped services it is true once an instance exists in
    /// any context, not necessarily in the context a lookup would use now.
    pub fn has(&self, id: impl Into<ServiceId>) -> bool {
        let id = id.into();
        self.with_state(|state| state.shared.contains_key(&id) || state.scoped.contains_key(&id))
    }

    /// Drops the scoped instances of all contexts which no longer exist
    ///
    /// Stale scopes of a service are also dropped whenever that service is
    /// constructed in a new scope. Returns how many instances were dropped.
    pub fn purge_scopes(&self) -> usize {
        let evicted: Vec<Instance> = self.with_state(|state| {
            state
                .scoped
                .values_mut()
                .flat_map(ScopedInstances::evict_stale)
                .collect()
        });
        // Dropping runs user code, which may use the container again
        evicted.len()
    }

    pub fn spec(&self) -> &Specification {
        &self.0.spec
    }
}

// Resolution
impl Container {
    /// Innermost step of the lookup pipeline
    fn resolve_service(&self, id: &ServiceId) -> Result<Instance, ResolveError> {
        let Some(definition) = self.0.spec.get(id) else {
            tracing::error!("Tried to get an unregistered service: {}", id);
            return Err(ResolveError::UnknownService(id.clone()));
        };

        match &definition.lifetime {
            Lifetime::Shared => {
                if let Some(instance) = self.with_state(|state| state.shared.get(id).cloned()) {
                    tracing::trace!("Reusing shared instance of {}", id);
                    return Ok(instance);
                }

                self.create_service(id, definition, |state, instance| {
                    state.shared.insert(id.clone(), instance);
                    Vec::new()
                })
            }
            Lifetime::Transient => self.create_service(id, definition, |_, _| Vec::new()),
            Lifetime::Scoped(resolver) => {
                let context = resolver.resolve_context(self)?;
                if let Some(instance) = self.with_state(|state| state.scoped_instance(id, &context))
                {
                    tracing::trace!("Reusing scoped instance of {}", id);
                    return Ok(instance);
                }

                self.create_service(id, definition, |state, instance| {
                    state
                        .scoped
                        .entry(id.clone())
                        .or_default()
                        .insert(&context, instance)
                })
            }
        }
    }

    /// Runs the factory, caches the result with `store`, then runs the injector
    ///
    /// `store` returns the instances it evicted, they are dropped after the state is released.
    fn create_service(
        &self,
        id: &ServiceId,
        definition: &ServiceDefinition,
        store: impl FnOnce(&mut ContainerState, Instance) -> Vec<Instance>,
    ) -> Result<Instance, ResolveError> {
        let instance = {
            let _in_flight = self.enter(id)?;
            definition.factory.construct(self)?
        };
        tracing::debug!("Constructed instance of {} as {}", id, instance.info);

        let evicted = self.with_state(|state| store(state, instance.clone()));
        drop(evicted);

        if let Some(injector) = &definition.injector {
            injector.inject(id, &instance, self)?;
            tracing::debug!("Injected dependencies into {}", id);
        }

        Ok(instance)
    }

    /// Marks `id` as under construction until the returned guard is dropped
    fn enter<'a>(&'a self, id: &'a ServiceId) -> Result<InFlightGuard<'a>, ResolveError> {
        self.with_state(|state| {
            if state.in_flight.contains(id) {
                let mut chain = state.in_flight.clone();
                chain.push(id.clone());
                tracing::debug!("Circular reference while constructing {}", id);
                return Err(ResolveError::CircularReference {
                    id: id.clone(),
                    chain,
                });
            }

            state.in_flight.push(id.clone());
            Ok(())
        })?;

        Ok(InFlightGuard {
            container: self,
            id,
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ContainerState) -> R) -> R {
        let guard = self.0.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }
}

impl ContainerState {
    fn scoped_instance(&self, id: &ServiceId, context: &Context) -> Option<Instance> {
        self.scoped.get(id)?.get(context)
    }
}

/// Releases the in-flight mark on every exit path of a factory, including errors and panics
struct InFlightGuard<'a> {
    container: &'a Container,
    id: &'a ServiceId,
}
impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.container.with_state(|state| {
            if let Some(position) = state.in_flight.iter().rposition(|id| id == self.id) {
                state.in_flight.remove(position);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{builder::ServiceSpecBuilder, scope::new_context};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn container_is_send_and_sync() {
        assert_send_sync::<Container>();
    }

    #[test]
    fn failed_factory_releases_in_flight_mark() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut builder = ServiceSpecBuilder::new();
        let counter = attempts.clone();
        builder.set("flaky", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ResolveError::other("first attempt fails"))
            } else {
                Ok(String::from("second attempt"))
            }
        });
        let container = Container::new(builder.get_service_spec());

        let error = container.get::<String>("flaky").unwrap_err();
        assert_eq!(error.to_string(), "first attempt fails");
        assert!(!container.has("flaky"));

        // A stuck mark would report a circular reference here
        assert_eq!(*container.get::<String>("flaky").unwrap(), "second attempt");
        assert!(container.with_state(|state| state.in_flight.is_empty()));
    }

    #[test]
    fn panicking_factory_releases_in_flight_mark() {
        let mut builder = ServiceSpecBuilder::new();
        builder.set("panics", |_| -> Result<String, ResolveError> { panic!("factory panicked") });
        let container = Container::new(builder.get_service_spec());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            container.get::<String>("panics")
        }));

        assert!(result.is_err());
        assert!(container.with_state(|state| state.in_flight.is_empty()));
    }

    #[test]
    fn wrong_type_fails_downcast() {
        let mut builder = ServiceSpecBuilder::new();
        builder.set("number", |_| Ok(42_u32));
        let container = Container::new(builder.get_service_spec());

        match container.get::<String>("number") {
            Err(ResolveError::DowncastFailed {
                id,
                required_type,
                actual_type,
            }) => {
                assert_eq!(id, ServiceId::from("number"));
                assert_eq!(required_type, type_name::<String>());
                assert_eq!(actual_type, type_name::<u32>());
            }
            other => panic!("expected a downcast failure, got {other:?}"),
        }
        assert_eq!(*container.get::<u32>("number").unwrap(), 42);
    }

    #[test]
    fn has_reflects_instantiation() {
        let context = new_context();
        let mut builder = ServiceSpecBuilder::new();
        builder.set("shared", |_| Ok(1_u8));
        builder.set("transient", |_| Ok(2_u8)).transient();
        let scope = context.clone();
        builder
            .set("scoped", |_| Ok(3_u8))
            .scoped(move |_| Ok(scope.clone()));
        let container = Container::new(builder.get_service_spec());

        assert!(!container.has("shared"));
        assert!(!container.has("unregistered"));

        container.get::<u8>("shared").unwrap();
        container.get::<u8>("transient").unwrap();
        container.get::<u8>("scoped").unwrap();

        assert!(container.has("shared"));
        assert!(!container.has("transient"));
        assert!(container.has("scoped"));
    }

    #[test]
    fn purge_drops_instances_of_dead_contexts() {
        let current = Arc::new(parking_lot::Mutex::new(new_context()));
        let mut builder = ServiceSpecBuilder::new();
        let resolver_current = current.clone();
        builder
            .set("scoped", |_| Ok(String::from("per scope")))
            .scoped(move |_| Ok(resolver_current.lock().clone()));
        let container = Container::new(builder.get_service_spec());

        let instance = container.get::<String>("scoped").unwrap();
        let weak_instance = Arc::downgrade(&instance);
        drop(instance);

        *current.lock() = new_context();

        assert!(weak_instance.upgrade().is_some());
        assert_eq!(container.purge_scopes(), 1);
        assert!(weak_instance.upgrade().is_none());
        // The quirk: the service still counts as instantiated
        assert!(container.has("scoped"));
    }

    #[test]
    fn debug_lists_cache_state() {
        let mut builder = ServiceSpecBuilder::new();
        builder.set("a", |_| Ok(1_u8));
        builder.set("b", |_| Ok(2_u8));
        let container = Container::new(builder.get_service_spec());
        container.get::<u8>("a").unwrap();

        let debug = format!("{container:?}");
        assert!(debug.contains("a: \"shared\""));
        assert!(debug.contains("b: \"not instantiated\""));
    }
}
