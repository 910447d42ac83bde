use std::{ops::Deref, sync::Arc};

use vorarbeiter::{Container, Injectable, ResolveError, TypeInfo};

use crate::{errors::ConfigError, provider::ConfigProvider};

/// A wrapper type to allow for config injections
///
/// This provides a simple way to retrieve configs from the config registry,
/// and use them in a factory while it builds its service
///
/// # Example
/// ```rust
/// use vorarbeiter::{create_service_container, create_service_spec_builder};
/// use vorarbeiter_config::{Config, ConfigProvider};
///
/// pub struct MyModuleConfig {
///     enabled: bool,
/// }
///
/// pub struct MyModule {
///     enabled: bool,
/// }
///
/// let mut config_provider = ConfigProvider::new();
/// config_provider
///     .add_config(MyModuleConfig { enabled: true })
///     .unwrap();
///
/// let mut builder = create_service_spec_builder();
/// config_provider.register(&mut builder);
/// builder.set("my_module", |container| {
///     let config = Config::<MyModuleConfig>::resolve(container)?;
///     Ok(MyModule {
///         enabled: config.enabled,
///     })
/// });
///
/// let container = create_service_container(builder.get_service_spec());
/// assert!(container.get::<MyModule>("my_module").unwrap().enabled);
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

impl<T: Injectable> Config<T> {
    /// Reads the config of type `T` from the [`ConfigProvider`] registered in `container`
    pub fn resolve(container: &Container) -> Result<Self, ResolveError> {
        let config_provider = container.get::<ConfigProvider>(ConfigProvider::service_id())?;

        let config: Arc<T> = config_provider
            .get_config::<T>()
            .map_err(ResolveError::other)?
            .ok_or_else(|| ResolveError::other(ConfigError::ConfigMissing(TypeInfo::of::<T>())))?;

        Ok(Config { inner: config })
    }
}
