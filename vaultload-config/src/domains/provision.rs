//! Tenant provisioning configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};

/// Provisioning configuration: where the tenant lives and how much data to create
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Tenant name; a random one is generated when empty
    #[serde(default)]
    pub tenant: String,

    /// Tenant management endpoint (`POST {admin_endpoint}/tenant`)
    #[serde(default = "default_admin_endpoint")]
    pub admin_endpoint: String,

    /// Initial admin user created on the tenant
    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// Initial admin password; derived from the admin user when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,

    /// Authorization header value sent when creating tenants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_authorization: Option<String>,

    /// Tenant domain; tenants are reachable at `https://{tenant}.{domain}`
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Override for the tenant base URL (mostly for tests and local stacks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_base_url: Option<String>,

    /// Number of users to create
    #[serde(default = "default_users")]
    pub users: usize,

    /// Number of secrets to create
    #[serde(default = "default_secrets")]
    pub secrets: usize,

    /// Unique permissions per user; also the number of first-level secret folders
    #[serde(default = "default_permissions")]
    pub permissions: usize,

    /// Length of each secret's data
    #[serde(default = "default_secret_length")]
    pub secret_length: usize,

    /// Size of the command worker pool
    #[serde(default = "crate::domains::utils::default_parallelism")]
    pub workers: usize,

    /// External CLI invocation
    #[serde(default)]
    pub cli: CliConfig,
}

/// External CLI binary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Binary name or path
    #[serde(default = "default_cli_binary")]
    pub binary: String,

    /// Config file passed as `--config <path>` on every invocation
    #[serde(default = "default_cli_config_file")]
    pub config_file: String,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            tenant: String::new(),
            admin_endpoint: default_admin_endpoint(),
            admin_user: default_admin_user(),
            admin_password: None,
            admin_authorization: None,
            domain: default_domain(),
            tenant_base_url: None,
            users: default_users(),
            secrets: default_secrets(),
            permissions: default_permissions(),
            secret_length: default_secret_length(),
            workers: crate::domains::utils::default_parallelism(),
            cli: CliConfig::default(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            binary: default_cli_binary(),
            config_file: default_cli_config_file(),
        }
    }
}

impl ProvisionConfig {
    /// Password of the initial admin user
    pub fn admin_password(&self) -> String {
        match &self.admin_password {
            Some(password) if !password.is_empty() => password.clone(),
            _ => format!("{0}@1{0}@1", self.admin_user),
        }
    }

    /// Base URL of a tenant's own API
    pub fn tenant_base_url(&self, tenant: &str) -> String {
        match &self.tenant_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}", tenant, self.domain),
        }
    }
}

impl Validatable for ProvisionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.admin_endpoint, "admin_endpoint", self.domain_name())?;
        validate_required_string(&self.admin_user, "admin_user", self.domain_name())?;
        validate_required_string(&self.domain, "domain", self.domain_name())?;

        if let Some(ref base) = self.tenant_base_url {
            validate_url(base, "tenant_base_url", self.domain_name())?;
        }

        validate_positive(self.permissions, "permissions", self.domain_name())?;
        validate_positive(self.workers, "workers", self.domain_name())?;

        self.cli.validate()
    }

    fn domain_name(&self) -> &'static str {
        "provision"
    }
}

impl Validatable for CliConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.binary, "binary", self.domain_name())?;
        validate_required_string(&self.config_file, "config_file", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "provision.cli"
    }
}

fn default_admin_endpoint() -> String {
    "https://admin.qabambe.com/Prod".to_string()
}

fn default_admin_user() -> String {
    "admin".to_string()
}

fn default_domain() -> String {
    "qabambe.com".to_string()
}

fn default_users() -> usize {
    10
}

fn default_secrets() -> usize {
    50
}

fn default_permissions() -> usize {
    5
}

fn default_secret_length() -> usize {
    100
}

fn default_cli_binary() -> String {
    if cfg!(windows) {
        "thy.exe".to_string()
    } else {
        "thy".to_string()
    }
}

fn default_cli_config_file() -> String {
    ".thy.yml".to_string()
}
