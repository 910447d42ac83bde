use std::{
    any::{Any, TypeId},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Errors raised by user code (factories, injectors, resolvers, middleware)
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// A container may be shared between threads
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Scope token for scoped services.
///
/// Two resolutions share a scope iff they produce the same allocation,
/// the value behind the `Arc` is never inspected.
pub type Context = Arc<dyn Any + Send + Sync>;

static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(0);

/// Identifier of a service within a [`Specification`](crate::Specification)
///
/// Either a plain name, where equal names are equal ids, or a unique
/// symbol-like id, which is only ever equal to its own clones.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(IdKind);

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum IdKind {
    Named(Arc<str>),
    Unique { serial: u64, description: Arc<str> },
}

impl ServiceId {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        ServiceId(IdKind::Named(name.into()))
    }

    /// Creates an id that differs from every other id, even one created with the same description
    pub fn unique(description: impl Into<Arc<str>>) -> Self {
        ServiceId(IdKind::Unique {
            serial: NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        })
    }

    /// The name, or the description for unique ids
    pub fn description(&self) -> &str {
        match &self.0 {
            IdKind::Named(name) => name,
            IdKind::Unique { description, .. } => description,
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(self.0, IdKind::Unique { .. })
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            IdKind::Named(name) => f.write_str(name),
            IdKind::Unique { description, .. } => write!(f, "Symbol({description})"),
        }
    }
}
impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            IdKind::Named(name) => f.debug_tuple("ServiceId").field(name).finish(),
            IdKind::Unique {
                serial,
                description,
            } => write!(f, "ServiceId(Symbol({description})#{serial})"),
        }
    }
}

impl From<&str> for ServiceId {
    fn from(name: &str) -> Self {
        ServiceId::named(name)
    }
}
impl From<String> for ServiceId {
    fn from(name: String) -> Self {
        ServiceId::named(name)
    }
}
impl From<&ServiceId> for ServiceId {
    fn from(id: &ServiceId) -> Self {
        id.clone()
    }
}

/// Type erased service instance
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub fn new<ExistingInstance: Injectable>(instance: ExistingInstance) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    pub fn from_arc<ExistingInstance: Injectable>(instance: Arc<ExistingInstance>) -> Self {
        Instance {
            info: TypeInfo::of::<ExistingInstance>(),
            instance,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// Whether both handles point to the very same service
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.instance), Arc::as_ptr(&other.instance))
    }
}
impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_ids_compare_by_name() {
        assert_eq!(ServiceId::from("car"), ServiceId::named(String::from("car")));
        assert_ne!(ServiceId::from("car"), ServiceId::from("driver"));
        assert_eq!(ServiceId::from("car").to_string(), "car");
    }

    #[test]
    fn unique_ids_never_collide() {
        let first = ServiceId::unique("car");
        let second = ServiceId::unique("car");

        assert_ne!(first, second);
        assert_eq!(first, first.clone());
        assert_ne!(first, ServiceId::from("car"));
        assert_eq!(first.to_string(), "Symbol(car)");
        assert_eq!(first.description(), "car");
        assert!(first.is_unique());
    }

    #[test]
    fn instance_downcast_reports_actual_type() {
        let instance = Instance::new(String::from("driver"));

        assert_eq!(*instance.downcast::<String>().unwrap(), "driver");
        assert_eq!(
            instance.downcast::<u32>().unwrap_err(),
            std::any::type_name::<String>()
        );
        assert!(instance.ptr_eq(&instance.clone()));
        assert!(!instance.ptr_eq(&Instance::new(String::from("driver"))));
    }
}
