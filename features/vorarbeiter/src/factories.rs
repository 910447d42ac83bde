use std::{marker::PhantomData, sync::Arc};

use crate::{
    container::Container,
    errors::ResolveError,
    types::{Context, Injectable, Instance, ServiceId, TypeInfo},
};

/// A Factory providing instances of a given type
pub trait ServiceFactory: Send + Sync + 'static {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Constructs a new instance of the factory's provided type
    ///
    /// Dependencies are fetched from `container`, any error they raise should be passed on unchanged
    fn create(&self, container: &Container) -> Result<Self::Provides, ResolveError>;
}

/// Second phase initializer, runs after the service was constructed and cached
///
/// Services are shared, so injectors mutate through interior mutability.
pub trait ServiceInjector: Send + Sync + 'static {
    type Target: Injectable;

    fn inject(&self, service: &Arc<Self::Target>, container: &Container)
        -> Result<(), ResolveError>;
}

/// Decides which scope a scoped service is resolved in
pub trait ContextResolver: Send + Sync + 'static {
    fn resolve_context(&self, container: &Container) -> Result<Context, ResolveError>;
}

/// Adapter turning a closure into a [`ServiceFactory`]
pub struct FnFactory<F, T> {
    create: F,
    _provides: PhantomData<fn() -> T>,
}
impl<F, T> FnFactory<F, T>
where
    F: Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
    T: Injectable,
{
    pub fn new(create: F) -> Self {
        FnFactory {
            create,
            _provides: PhantomData,
        }
    }
}
impl<F, T> ServiceFactory for FnFactory<F, T>
where
    F: Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
    T: Injectable,
{
    type Provides = T;

    fn create(&self, container: &Container) -> Result<T, ResolveError> {
        (self.create)(container)
    }
}

/// Adapter turning a closure into a [`ServiceInjector`]
pub struct FnInjector<F, T> {
    inject: F,
    _target: PhantomData<fn(&T)>,
}
impl<F, T> FnInjector<F, T>
where
    F: Fn(&Arc<T>, &Container) -> Result<(), ResolveError> + Send + Sync + 'static,
    T: Injectable,
{
    pub fn new(inject: F) -> Self {
        FnInjector {
            inject,
            _target: PhantomData,
        }
    }
}
impl<F, T> ServiceInjector for FnInjector<F, T>
where
    F: Fn(&Arc<T>, &Container) -> Result<(), ResolveError> + Send + Sync + 'static,
    T: Injectable,
{
    type Target = T;

    fn inject(&self, service: &Arc<T>, container: &Container) -> Result<(), ResolveError> {
        (self.inject)(service, container)
    }
}

/// Adapter turning a closure into a [`ContextResolver`]
pub struct FnContextResolver<F>(pub F);
impl<F> ContextResolver for FnContextResolver<F>
where
    F: Fn(&Container) -> Result<Context, ResolveError> + Send + Sync + 'static,
{
    fn resolve_context(&self, container: &Container) -> Result<Context, ResolveError> {
        (self.0)(container)
    }
}

/// Wrapper Trait for factories, providing instances of Any
pub(crate) trait DynFactory: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    fn construct(&self, container: &Container) -> Result<Instance, ResolveError>;
}
// Impl DynFactory for any ServiceFactory
impl<SpecificFactory: ServiceFactory> DynFactory for SpecificFactory {
    fn supplies(&self) -> TypeInfo {
        SpecificFactory::supplies()
    }

    fn construct(&self, container: &Container) -> Result<Instance, ResolveError> {
        SpecificFactory::create(self, container).map(Instance::new)
    }
}

/// Wrapper Trait for injectors, accepting instances of Any
pub(crate) trait DynInjector: Send + Sync {
    fn inject(
        &self,
        id: &ServiceId,
        instance: &Instance,
        container: &Container,
    ) -> Result<(), ResolveError>;
}
impl<SpecificInjector: ServiceInjector> DynInjector for SpecificInjector {
    fn inject(
        &self,
        id: &ServiceId,
        instance: &Instance,
        container: &Container,
    ) -> Result<(), ResolveError> {
        let service = instance
            .downcast::<SpecificInjector::Target>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                id: id.clone(),
                required_type: std::any::type_name::<SpecificInjector::Target>(),
                actual_type,
            })?;

        SpecificInjector::inject(self, &service, container)
    }
}
