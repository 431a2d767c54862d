//! Server configuration for the coordinator, agent and report listeners

use crate::error::ConfigResult;
use crate::validation::{validate_port_range, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Coordinator port (`serve`)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Port the one-shot `attack` command serves its report on
    #[serde(default = "default_report_port")]
    pub report_port: u16,

    /// Reshape load test results into the dashboard table schema
    #[serde(default = "crate::domains::utils::default_false")]
    pub redash: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            report_port: default_report_port(),
            redash: false,
        }
    }
}

impl Validatable for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.bind_address, "bind_address", self.domain_name())?;
        validate_port_range(self.port, "port", self.domain_name())?;
        validate_port_range(self.report_port, "report_port", self.domain_name())?;

        if self.port == self.report_port {
            return Err(self.validation_error("port and report_port must differ"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "server"
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_report_port() -> u16 {
    3001
}
