//! Configuration errors

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A `VAULTLOAD_*` variable is set but does not parse
    #[error("Invalid environment override: {0}")]
    EnvOverride(String),

    /// A domain failed validation
    #[error("Invalid {domain} configuration: {message}")]
    Invalid { domain: String, message: String },
}
