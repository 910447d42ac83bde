use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    factories::{ContextResolver, DynFactory, DynInjector},
    middleware::Middleware,
    types::{ServiceId, TypeInfo},
};

/// How long a constructed service is reused
#[derive(Clone)]
pub enum Lifetime {
    /// One instance per container
    Shared,
    /// A new instance on every lookup
    Transient,
    /// One instance per context returned by the resolver
    Scoped(Arc<dyn ContextResolver>),
}
impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Shared => f.write_str("Shared"),
            Lifetime::Transient => f.write_str("Transient"),
            Lifetime::Scoped(_) => f.write_str("Scoped"),
        }
    }
}

/// Everything needed to construct one service
#[derive(Clone)]
pub struct ServiceDefinition {
    pub(crate) factory: Arc<dyn DynFactory>,
    pub(crate) lifetime: Lifetime,
    pub(crate) injector: Option<Arc<dyn DynInjector>>,
}
impl ServiceDefinition {
    pub(crate) fn new(factory: Arc<dyn DynFactory>) -> Self {
        ServiceDefinition {
            factory,
            lifetime: Lifetime::Shared,
            injector: None,
        }
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    /// The type produced by the factory
    pub fn provides(&self) -> TypeInfo {
        self.factory.supplies()
    }

    pub fn has_injector(&self) -> bool {
        self.injector.is_some()
    }
}
impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("provides", &self.provides().type_name)
            .field("lifetime", &self.lifetime)
            .field("injector", &self.has_injector())
            .finish()
    }
}

/// Immutable set of service definitions and the middleware wrapping their lookup
#[derive(Clone, Default)]
pub struct Specification {
    services: HashMap<ServiceId, ServiceDefinition>,
    middlewares: Vec<Arc<dyn Middleware>>,
}
impl Specification {
    pub(crate) fn new(
        services: HashMap<ServiceId, ServiceDefinition>,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        Specification {
            services,
            middlewares,
        }
    }

    pub fn has(&self, id: &ServiceId) -> bool {
        self.services.contains_key(id)
    }

    pub fn get(&self, id: &ServiceId) -> Option<&ServiceDefinition> {
        self.services.get(id)
    }

    /// All registered ids, in no particular order
    pub fn ids(&self) -> impl Iterator<Item = &ServiceId> {
        self.services.keys()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Middlewares in registration order
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }
}
impl fmt::Debug for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_struct("Specification");
        let mut services: Vec<_> = self.services.iter().collect();
        services.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (id, definition) in services {
            map.field(&id.to_string(), definition);
        }
        map.field("middlewares", &self.middlewares.len());
        map.finish()
    }
}
