//! Domain-specific configuration modules

pub mod http;
pub mod load;
pub mod logging;
pub mod provision;
pub mod server;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main vaultload configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VaultloadConfig {
    /// Tenant provisioning configuration
    #[serde(default)]
    pub provision: provision::ProvisionConfig,

    /// Load test configuration
    #[serde(default)]
    pub load: load::LoadConfig,

    /// HTTP client configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Server configuration (coordinator, agent and report ports)
    #[serde(default)]
    pub server: server::ServerConfig,
}

impl VaultloadConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.provision.validate()?;
        self.load.validate()?;
        self.http.validate()?;
        self.logging.validate()?;
        self.server.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = VaultloadConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
