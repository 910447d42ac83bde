use std::sync::Arc;

use thiserror::Error;

use crate::types::{DynError, ServiceId};

/// Errors surfaced by [`Container::get`](crate::Container::get)
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// No definition is registered for the id
    #[error("unknown service \"{0}\"")]
    UnknownService(ServiceId),
    /// A factory re-entered a service that is still under construction
    #[error("circular dependency detected: {}", join_chain(.chain))]
    CircularReference {
        id: ServiceId,
        /// Every id under construction in entry order, ending with `id`
        chain: Vec<ServiceId>,
    },
    /// The service was requested as a different type than its factory produced
    #[error("Failed to downcast '{id}', required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        id: ServiceId,
        required_type: &'static str,
        actual_type: &'static str,
    },
    /// Error raised by a factory, injector, context resolver or middleware
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl ResolveError {
    /// Wraps a user error so it can leave a factory or injector
    pub fn other(error: impl Into<DynError>) -> Self {
        ResolveError::Other(Arc::from(error.into()))
    }

    /// The offending id, if the error is about a specific service
    pub fn id(&self) -> Option<&ServiceId> {
        match self {
            ResolveError::UnknownService(id)
            | ResolveError::CircularReference { id, .. }
            | ResolveError::DowncastFailed { id, .. } => Some(id),
            ResolveError::Other(_) => None,
        }
    }

    pub fn reference_chain(&self) -> Option<&[ServiceId]> {
        match self {
            ResolveError::CircularReference { chain, .. } => Some(chain),
            _ => None,
        }
    }
}

fn join_chain(chain: &[ServiceId]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
