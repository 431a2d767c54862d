//! HTTP handlers

pub mod agent;
pub mod coordinator;
pub mod health;

pub use agent::{agent_metrics, run_load_job};
pub use coordinator::{get_summary, run_command, run_command_query};
pub use health::{agent_health, coordinator_health};
