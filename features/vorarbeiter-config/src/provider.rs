use std::{any::TypeId, collections::HashMap, sync::Arc};

use vorarbeiter::{Injectable, Instance, ServiceId, ServiceSpecBuilder, TypeInfo};

use crate::errors::ConfigError;

/// A provider to register all configs.
///
/// Configs can be registered and retrieved based on type.
#[derive(Clone, Default, Debug)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, Instance>,
}

impl ConfigProvider {
    /// Initializes an empty Config Provider
    pub fn new() -> Self {
        Self {
            configs: HashMap::new(),
        }
    }

    /// Id the provider is registered under by [`ConfigProvider::register`]
    pub fn service_id() -> ServiceId {
        ServiceId::from(std::any::type_name::<ConfigProvider>())
    }

    /// Retrieve a config with specified type.
    ///
    /// Returns `Ok(None)` if no config of this type was registered
    pub fn get_config<T: Injectable>(&self) -> Result<Option<Arc<T>>, ConfigError> {
        self.configs
            .get(&TypeId::of::<T>())
            .map(|entry| entry.downcast())
            .transpose()
            .map_err(|_| ConfigError::ConfigMissing(TypeInfo::of::<T>()))
    }

    /// Add a config to the registry.
    ///
    /// If the config type is already registered, it will return a
    /// [`ConfigError::ConfigAlreadyRegistered`] error
    pub fn add_config<T: Injectable>(&mut self, config: T) -> Result<&mut Self, ConfigError> {
        let type_id = TypeId::of::<T>();

        if self.configs.contains_key(&type_id) {
            return Err(ConfigError::ConfigAlreadyRegistered(TypeInfo::of::<T>()));
        }

        tracing::debug!("Registered config {}", std::any::type_name::<T>());
        self.configs.insert(type_id, Instance::new(config));
        Ok(self)
    }

    /// Can optionally add a config to the registry.
    ///
    /// If the config provided is `Some(T)`, it will be the same as calling [`ConfigProvider::add_config`]
    /// If the config provided is `None`, then the function just returns `Ok(self)` for chaining
    pub fn maybe_add_config<T: Injectable>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, ConfigError> {
        match config {
            Some(c) => self.add_config(c),
            None => Ok(self),
        }
    }

    /// Registers the provider as a shared service under [`ConfigProvider::service_id`]
    pub fn register(self, builder: &mut ServiceSpecBuilder) {
        builder.set(Self::service_id(), move |_| Ok(self.clone()));
    }
}
