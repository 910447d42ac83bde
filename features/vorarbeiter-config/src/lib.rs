//! Vorarbeiter Config provides a registry of configs that can be read by the
//! factories of a service container.
//!
//! Vorarbeiter Config is split into two major parts:
//! 1. ConfigProvider: Used to create the registry of all configs, registered as a service
//! 2. Config<T>: A wrapper type to resolve and retrieve configs from the container
//!
//! # Examples
//!
//! ```rust
//! use vorarbeiter_config::ConfigProvider;
//!
//! struct AppConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! let mut config_provider = ConfigProvider::new();
//! config_provider
//!     .add_config(AppConfig {
//!         host: "localhost".to_string(),
//!         port: 8080_u16,
//!     })
//!     .unwrap();
//!
//! let retrieved_config = config_provider.get_config::<AppConfig>().unwrap().unwrap();
//! assert_eq!(retrieved_config.host, "localhost");
//! assert_eq!(retrieved_config.port, 8080);
//! ```

pub mod config;
pub mod errors;
pub mod provider;

pub use config::Config;
pub use errors::ConfigError;
pub use provider::ConfigProvider;
