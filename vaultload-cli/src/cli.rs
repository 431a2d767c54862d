//! CLI argument parsing definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vaultload_loadtest::LoadJobSpec;
use vaultload_server::RunRequest;

#[derive(Parser)]
#[command(name = "vaultload", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one operation against a tenant and print its result
    Run {
        /// Operation to conduct: setup, teardown, test or full
        #[arg(short, long, value_name = "OP")]
        operation: String,

        #[command(flatten)]
        overrides: RunArgs,
    },

    /// Start the coordinator API
    Serve {
        /// Port to listen on (defaults to server.port)
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Start a worker agent that accepts load jobs
    Agent {
        /// Port to listen on (defaults to load.agent_port)
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Run one local attack, then serve its report until interrupted
    Attack(AttackArgs),

    /// Poll every agent's metrics and serve the merged summary
    Aggregate {
        /// Port to listen on (defaults to server.report_port)
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

/// Per-run overrides of the configured provisioning and load settings
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Tenant name (random when blank for setup and full)
    #[arg(short, long)]
    pub tenant: Option<String>,

    /// Tenant management API endpoint
    #[arg(short, long)]
    pub admin_endpoint: Option<String>,

    /// Admin user for the tenant
    #[arg(long)]
    pub admin_user: Option<String>,

    /// Admin password (derived from the admin user when omitted)
    #[arg(long)]
    pub admin_password: Option<String>,

    /// Tenant domain
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Number of users to create
    #[arg(short, long)]
    pub users: Option<usize>,

    /// Number of secrets to create
    #[arg(short, long)]
    pub secrets: Option<usize>,

    /// Unique permissions per user
    #[arg(short, long)]
    pub permissions: Option<usize>,

    /// Length of each secret's data
    #[arg(short = 'l', long)]
    pub secret_length: Option<usize>,

    /// Duration of the load test in seconds
    #[arg(long)]
    pub load_duration: Option<u64>,

    /// Load test rate in requests per second
    #[arg(long)]
    pub load_rate: Option<u64>,

    /// Attack a fixed list of unauthenticated targets
    #[arg(long)]
    pub static_targeter: bool,

    /// Print test results in the dashboard table format
    #[arg(long)]
    pub redash: bool,
}

impl RunArgs {
    pub fn into_request(self, operation: String) -> RunRequest {
        RunRequest {
            operation,
            tenant: self.tenant.unwrap_or_default(),
            admin_endpoint: self.admin_endpoint.unwrap_or_default(),
            admin_user: self.admin_user.unwrap_or_default(),
            admin_password: self.admin_password.unwrap_or_default(),
            domain: self.domain.unwrap_or_default(),
            redash: self.redash.then_some(true),
            number_users: self.users.unwrap_or_default(),
            number_secrets: self.secrets.unwrap_or_default(),
            number_permissions: self.permissions.unwrap_or_default(),
            secret_length: self.secret_length.unwrap_or_default(),
            load_duration: self.load_duration.unwrap_or_default(),
            load_rate: self.load_rate.unwrap_or_default(),
            static_targeter: self.static_targeter.then_some(true),
        }
    }
}

/// One local attack
#[derive(Args, Debug)]
pub struct AttackArgs {
    /// Tenant to attack
    #[arg(long)]
    pub tenant: String,

    /// Tenant domain (defaults to provision.domain)
    #[arg(long)]
    pub domain: Option<String>,

    /// Comma separated list of secret paths
    #[arg(long, value_delimiter = ',', required = true)]
    pub secret_paths: Vec<String>,

    /// Comma separated list of auth tokens
    #[arg(long, value_delimiter = ',')]
    pub tokens: Vec<String>,

    /// Requests per second (defaults to load.rate)
    #[arg(long)]
    pub rate: Option<u64>,

    /// Duration in seconds (defaults to load.duration)
    #[arg(long)]
    pub duration: Option<u64>,

    /// Requests in flight (defaults to load.workers)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Round-robin over the paths without auth tokens
    #[arg(long)]
    pub static_targeter: bool,
}

impl AttackArgs {
    pub fn into_job(self, defaults: &vaultload_config::LoadConfig) -> LoadJobSpec {
        LoadJobSpec {
            tenant: self.tenant,
            domain: self.domain.unwrap_or_default(),
            rate: self.rate.unwrap_or(defaults.rate),
            duration: self.duration.unwrap_or(defaults.duration.as_secs()),
            secret_paths: self.secret_paths,
            tokens: self.tokens,
            static_targeter: self.static_targeter || defaults.static_targeter,
            workers: self.workers.unwrap_or(defaults.workers),
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output file path
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration in use
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}
