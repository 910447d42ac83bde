//! Vorarbeiter is a small dependency injection container.
//!
//! It consists of three parts:
//! 1. The [`ServiceSpecBuilder`] where one registers factories, lifetimes, injectors and middlewares
//! 2. The immutable [`Specification`] produced by the builder
//! 3. The [`Container`] which lazily constructs services from the specification when they are requested
//!
//! Services are constructed synchronously on first lookup. A factory receives the
//! container and fetches its own dependencies from it, cycles between factories
//! are reported as [`ResolveError::CircularReference`]. Injectors run after a
//! service was cached, so they can close cycles the factories cannot.
//!
//! ```
//! use std::sync::Arc;
//! use vorarbeiter::{create_service_container, create_service_spec_builder};
//!
//! struct Driver;
//! impl Driver {
//!     fn name(&self) -> &str {
//!         "Michael Schumacher"
//!     }
//! }
//!
//! struct Car {
//!     driver: Arc<Driver>,
//! }
//!
//! let mut builder = create_service_spec_builder();
//! builder.set("car", |container| {
//!     Ok(Car {
//!         driver: container.get("driver")?,
//!     })
//! });
//! builder.set("driver", |_| Ok(Driver));
//!
//! let container = create_service_container(builder.get_service_spec());
//! let car = container.get::<Car>("car").unwrap();
//! assert_eq!(car.driver.name(), "Michael Schumacher");
//! ```

pub mod builder;
pub mod container;
pub mod definition;
pub mod errors;
pub mod factories;
pub mod middleware;
pub mod scope;
pub mod types;

pub use builder::{DefinitionBuilder, ServiceSpecBuilder};
pub use container::Container;
pub use definition::{Lifetime, ServiceDefinition, Specification};
pub use errors::ResolveError;
pub use factories::{ContextResolver, ServiceFactory, ServiceInjector};
pub use middleware::{lookup, Lookup, Middleware, TraceLookups};
pub use scope::{new_context, NoActiveScope, ScopeSlot, SlotContextResolver};
pub use types::{Context, DynError, Injectable, Instance, ServiceId, TypeInfo};

/// Creates a container for `spec`
pub fn create_service_container(spec: Specification) -> Container {
    Container::new(spec)
}

/// Creates an empty builder to register services and middlewares on
pub fn create_service_spec_builder() -> ServiceSpecBuilder {
    ServiceSpecBuilder::new()
}
