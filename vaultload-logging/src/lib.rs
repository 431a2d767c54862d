//! Logging setup for vaultload
//!
//! All crates log through `tracing`; this crate owns the one place where a
//! global subscriber is installed, driven either by a [`LoggingConfig`] or by a
//! bare level string coming from the command line.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
pub use vaultload_config::{LogFormat, LogLevel, LoggingConfig};
