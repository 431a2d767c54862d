//! Operation requests accepted by the coordinator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use vaultload_config::domains::load::MAX_LOAD_DURATION_SECS;
use vaultload_config::VaultloadConfig;

use crate::errors::RestError;

/// What a run does to a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Setup,
    Test,
    Teardown,
    /// Setup, test and teardown in one go
    Full,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Setup => "setup",
            Operation::Test => "test",
            Operation::Teardown => "teardown",
            Operation::Full => "full",
        }
    }

    pub fn includes_setup(&self) -> bool {
        matches!(self, Operation::Setup | Operation::Full)
    }

    pub fn includes_test(&self) -> bool {
        matches!(self, Operation::Test | Operation::Full)
    }

    pub fn includes_teardown(&self) -> bool {
        matches!(self, Operation::Teardown | Operation::Full)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "setup" => Ok(Operation::Setup),
            "test" => Ok(Operation::Test),
            "teardown" => Ok(Operation::Teardown),
            "full" => Ok(Operation::Full),
            _ => Err(RestError::bad_request(format!(
                "operation did not match a valid operation. Value: '{}'",
                s
            ))),
        }
    }
}

/// Overrides for one run, from a JSON body or a query string.
///
/// Empty strings and zero counts leave the configured value in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunRequest {
    #[serde(alias = "Operation")]
    pub operation: String,
    #[serde(alias = "Tenant")]
    pub tenant: String,
    #[serde(alias = "AdminEndpoint")]
    pub admin_endpoint: String,
    #[serde(alias = "AdminUser")]
    pub admin_user: String,
    #[serde(alias = "AdminPassword")]
    pub admin_password: String,
    #[serde(alias = "Domain")]
    pub domain: String,
    #[serde(alias = "Redash")]
    pub redash: Option<bool>,
    #[serde(alias = "NumberUsers")]
    pub number_users: usize,
    #[serde(alias = "NumberSecrets")]
    pub number_secrets: usize,
    #[serde(alias = "NumberPermissions")]
    pub number_permissions: usize,
    #[serde(alias = "SecretLength")]
    pub secret_length: usize,
    /// Seconds
    #[serde(alias = "LoadDuration")]
    pub load_duration: u64,
    #[serde(alias = "LoadRate")]
    pub load_rate: u64,
    #[serde(alias = "StaticTargeter")]
    pub static_targeter: Option<bool>,
}

impl RunRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation: operation.to_string(),
            ..Default::default()
        }
    }

    /// Copy of `base` with this request's overrides applied
    pub fn apply(&self, base: &VaultloadConfig) -> VaultloadConfig {
        let mut config = base.clone();
        let provision = &mut config.provision;

        if !self.tenant.is_empty() {
            provision.tenant = self.tenant.clone();
        }
        provision.tenant = provision.tenant.trim().to_lowercase();
        if !self.admin_endpoint.is_empty() {
            provision.admin_endpoint = self.admin_endpoint.clone();
        }
        if !self.admin_user.is_empty() {
            provision.admin_user = self.admin_user.clone();
        }
        if !self.admin_password.is_empty() {
            provision.admin_password = Some(self.admin_password.clone());
        }
        if !self.domain.is_empty() {
            provision.domain = self.domain.clone();
        }
        if self.number_users > 0 {
            provision.users = self.number_users;
        }
        if self.number_secrets > 0 {
            provision.secrets = self.number_secrets;
        }
        if self.number_permissions > 0 {
            provision.permissions = self.number_permissions;
        }
        if self.secret_length > 0 {
            provision.secret_length = self.secret_length;
        }

        if self.load_duration > 0 {
            config.load.duration = Duration::from_secs(self.load_duration);
        }
        if self.load_rate > 0 {
            config.load.rate = self.load_rate;
        }
        if let Some(static_targeter) = self.static_targeter {
            config.load.static_targeter = static_targeter;
        }
        if let Some(redash) = self.redash {
            config.server.redash = redash;
        }

        config
    }

    /// Parse the operation, apply the overrides and validate the result
    pub fn resolve(&self, base: &VaultloadConfig) -> Result<(Operation, VaultloadConfig), RestError> {
        let operation: Operation = self.operation.parse()?;

        if self.load_duration > MAX_LOAD_DURATION_SECS {
            return Err(RestError::bad_request(format!(
                "load duration has a max of {} seconds",
                MAX_LOAD_DURATION_SECS
            )));
        }

        let config = self.apply(base);
        if operation == Operation::Teardown && config.provision.tenant.is_empty() {
            return Err(RestError::bad_request("must specify tenant"));
        }

        config
            .validate_all()
            .map_err(|e| RestError::bad_request(e.to_string()))?;

        Ok((operation, config))
    }
}
