//! Configuration loading and environment variable handling

use crate::domains::load::LoadConfig;
use crate::domains::provision::ProvisionConfig;
use crate::domains::VaultloadConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "VAULTLOAD".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<VaultloadConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: VaultloadConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<VaultloadConfig> {
        let mut config = VaultloadConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<VaultloadConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    fn apply_env_overrides(&self, config: &mut VaultloadConfig) -> ConfigResult<()> {
        self.apply_provision_overrides(&mut config.provision)?;
        self.apply_load_overrides(&mut config.load)?;
        self.apply_http_overrides(&mut config.http)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_server_overrides(&mut config.server)?;
        Ok(())
    }

    fn apply_provision_overrides(&self, config: &mut ProvisionConfig) -> ConfigResult<()> {
        if let Ok(tenant) = self.get_env_var("TENANT") {
            config.tenant = tenant;
        }

        if let Ok(endpoint) = self.get_env_var("ADMIN_ENDPOINT") {
            config.admin_endpoint = endpoint;
        }

        if let Ok(password) = self.get_env_var("ADMIN_PASSWORD") {
            config.admin_password = Some(password);
        }

        if let Ok(authorization) = self.get_env_var("ADMIN_AUTHORIZATION") {
            config.admin_authorization = Some(authorization);
        }

        if let Ok(domain) = self.get_env_var("DOMAIN") {
            config.domain = domain;
        }

        if let Some(users) = self.parse_env_var("USERS")? {
            config.users = users;
        }

        if let Some(secrets) = self.parse_env_var("SECRETS")? {
            config.secrets = secrets;
        }

        if let Some(workers) = self.parse_env_var("WORKERS")? {
            config.workers = workers;
        }

        if let Ok(binary) = self.get_env_var("CLI_BINARY") {
            config.cli.binary = binary;
        }

        Ok(())
    }

    fn apply_load_overrides(&self, config: &mut LoadConfig) -> ConfigResult<()> {
        if let Some(rate) = self.parse_env_var("LOAD_RATE")? {
            config.rate = rate;
        }

        if let Some(seconds) = self.parse_env_var::<u64>("LOAD_DURATION")? {
            config.duration = Duration::from_secs(seconds);
        }

        if let Some(workers) = self.parse_env_var("LOAD_WORKERS")? {
            config.workers = workers;
        }

        if let Ok(endpoints) = self.get_env_var("LOAD_ENDPOINTS") {
            config.endpoints = endpoints
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Some(seconds) = self.parse_env_var::<u64>("HTTP_TIMEOUT")? {
            config.timeout = Duration::from_secs(seconds);
        }

        if let Ok(user_agent) = self.get_env_var("HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Some(verify_ssl) = self.parse_env_var("HTTP_VERIFY_SSL")? {
            config.verify_ssl = verify_ssl;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvOverride(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvOverride(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn apply_server_overrides(
        &self,
        config: &mut crate::domains::server::ServerConfig,
    ) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Some(port) = self.parse_env_var("SERVER_PORT")? {
            config.port = port;
        }

        if let Some(redash) = self.parse_env_var("REDASH")? {
            config.redash = redash;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }

    /// Parse a prefixed environment variable, `None` when unset
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvOverride(format!("Invalid {}_{}: {}", self.prefix, name, e))),
            Err(_) => Ok(None),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
