//! Tenant provisioning for vaultload
//!
//! This crate builds the staged set of CLI commands that populate a secrets
//! store tenant (users, secrets, permissions, tokens), executes it through a
//! bounded worker pool with fail-fast stages, and talks to the tenant
//! management API that creates and removes tenants.

pub mod collector;
pub mod command;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod random;
pub mod runner;
pub mod tenant;
pub mod tree;

// Re-export main types
pub use collector::ResultCollector;
pub use command::{CmdResult, Command, CommandKind, CommandSet, Stage};
pub use error::{CommandError, ProvisionError, TenantApiError};
pub use pipeline::{Pipeline, PipelineReport, PipelineState};
pub use plan::{PlanSettings, ProvisionPlan};
pub use runner::{CliRunner, CommandRunner};
pub use tenant::TenantClient;
pub use tree::{NodeId, PathTree};
