use std::sync::Arc;

use crate::{
    container::Container,
    errors::ResolveError,
    types::{Instance, ServiceId},
};

/// One step of the lookup pipeline behind [`Container::get`]
pub type Lookup =
    Arc<dyn Fn(&Container, &ServiceId) -> Result<Instance, ResolveError> + Send + Sync>;

/// Builds a [`Lookup`] from a closure
pub fn lookup<F>(lookup: F) -> Lookup
where
    F: Fn(&Container, &ServiceId) -> Result<Instance, ResolveError> + Send + Sync + 'static,
{
    Arc::new(lookup)
}

/// Wraps the next lookup of the pipeline
///
/// Middlewares are applied in registration order, each one wrapping everything
/// registered before it. The last registered middleware therefore runs first.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: Lookup) -> Lookup;
}
impl<F> Middleware for F
where
    F: Fn(Lookup) -> Lookup + Send + Sync + 'static,
{
    fn wrap(&self, next: Lookup) -> Lookup {
        self(next)
    }
}

pub(crate) fn compose(core: Lookup, middlewares: &[Arc<dyn Middleware>]) -> Lookup {
    tracing::trace!("Composing lookup pipeline of {} middlewares", middlewares.len());
    middlewares
        .iter()
        .fold(core, |next, middleware| middleware.wrap(next))
}

/// Middleware emitting a `tracing` span and an outcome event for every lookup
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceLookups;
impl Middleware for TraceLookups {
    fn wrap(&self, next: Lookup) -> Lookup {
        lookup(move |container, id| {
            let span = tracing::debug_span!("lookup", service = %id);
            let _entered = span.enter();

            let result = next(container, id);
            match &result {
                Ok(instance) => tracing::debug!("Resolved {} as {}", id, instance.info),
                Err(e) => tracing::debug!("Failed to resolve {}: {}", id, e),
            }
            result
        })
    }
}
