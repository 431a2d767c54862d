//! Load test configuration

use crate::error::ConfigResult;
use crate::validation::{validate_at_most, validate_positive, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest load test a single run may request
pub const MAX_LOAD_DURATION_SECS: u64 = 3000;

/// Load test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Aggregate request rate across all agents (requests per second)
    #[serde(default = "default_rate")]
    pub rate: u64,

    /// Duration of the load test
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_duration"
    )]
    pub duration: Duration,

    /// Maximum in-flight requests per agent
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Use a fixed list of targets instead of randomized path/token pairs
    #[serde(default = "crate::domains::utils::default_false")]
    pub static_targeter: bool,

    /// Dispatch timeout as a multiple of the test duration
    #[serde(default = "default_timeout_factor")]
    pub timeout_factor: f64,

    /// Port agents listen on
    #[serde(default = "default_agent_port")]
    pub agent_port: u16,

    /// Base URLs of reachable worker agents
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Interval between metric polls in aggregate mode
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_poll_interval"
    )]
    pub poll_interval: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            duration: default_duration(),
            workers: default_workers(),
            static_targeter: false,
            timeout_factor: default_timeout_factor(),
            agent_port: default_agent_port(),
            endpoints: Vec::new(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl LoadConfig {
    /// How long a dispatcher waits for one agent before giving up
    pub fn dispatch_timeout(&self) -> Duration {
        self.duration.mul_f64(self.timeout_factor)
    }
}

impl Validatable for LoadConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.duration.as_secs(), "duration", self.domain_name())?;
        validate_at_most(
            self.duration.as_secs(),
            MAX_LOAD_DURATION_SECS,
            "duration",
            self.domain_name(),
        )?;
        validate_positive(self.workers, "workers", self.domain_name())?;
        validate_positive(self.poll_interval.as_secs(), "poll_interval", self.domain_name())?;

        if !(self.timeout_factor >= 1.0) {
            return Err(self.validation_error(format!(
                "timeout_factor must be at least 1.0, got {}",
                self.timeout_factor
            )));
        }

        for endpoint in &self.endpoints {
            validate_url(endpoint, "endpoints", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "load"
    }
}

fn default_rate() -> u64 {
    10
}

fn default_duration() -> Duration {
    Duration::from_secs(10)
}

fn default_workers() -> usize {
    10
}

fn default_timeout_factor() -> f64 {
    1.2
}

fn default_agent_port() -> u16 {
    8080
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_defaults() {
        let config = LoadConfig::default();
        assert_eq!(config.rate, 10);
        assert_eq!(config.duration, Duration::from_secs(10));
        assert_eq!(config.dispatch_timeout(), Duration::from_secs(12));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_cap() {
        let mut config = LoadConfig::default();
        config.duration = Duration::from_secs(MAX_LOAD_DURATION_SECS);
        assert!(config.validate().is_ok());

        config.duration = Duration::from_secs(MAX_LOAD_DURATION_SECS + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_and_factor_validation() {
        let mut config = LoadConfig::default();
        config.endpoints = vec!["http://10.1.0.7:8080".to_string()];
        assert!(config.validate().is_ok());

        config.endpoints.push("10.1.0.8".to_string());
        assert!(config.validate().is_err());

        let config = LoadConfig {
            timeout_factor: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
