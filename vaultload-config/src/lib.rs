//! Domain-driven configuration management for vaultload
//!
//! Configuration is split by functional domain (provisioning, load testing, HTTP,
//! logging, server), each with its own defaults and validation. A loaded
//! [`VaultloadConfig`] is an immutable value: callers that need per-request
//! overrides clone it and adjust the copy.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    http::HttpConfig,
    load::LoadConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    provision::{CliConfig, ProvisionConfig},
    server::ServerConfig,
    VaultloadConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
