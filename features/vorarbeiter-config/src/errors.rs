use vorarbeiter::TypeInfo;

/// Errors when trying to register or acquire a config
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigError {
    /// The required Config is not known
    #[error("The config type '{0}' is not registered")]
    ConfigMissing(TypeInfo),
    /// The Config type is already registered
    #[error("The config type '{0}' is already registered")]
    ConfigAlreadyRegistered(TypeInfo),
}
