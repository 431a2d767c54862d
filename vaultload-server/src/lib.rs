//! # vaultload server
//!
//! HTTP surfaces of vaultload:
//!
//! - the **coordinator** runs `setup`, `test`, `teardown` or `full` operations
//!   against a tenant and serves the latest merged load test summary
//! - the **agent** accepts a load job, attacks the tenant's secrets and answers
//!   with its metrics
//!
//! Both routers are plain axum apps; [`serve`] binds and runs either one.
//!
//! ```rust,no_run
//! use vaultload_config::VaultloadConfig;
//! use vaultload_server::{create_coordinator_app, CoordinatorContext, OperationRunner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VaultloadConfig::default();
//! let runner = OperationRunner::from_config(&config)?;
//! let app = create_coordinator_app(CoordinatorContext::new(config, runner));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod runner;

// Re-export commonly used types
pub use app::{
    create_agent_app, create_coordinator_app, create_report_app, create_summary_app, serve,
    shutdown_signal,
};
pub use context::{AgentContext, CoordinatorContext, SummaryContext};
pub use errors::{RestError, RestResult};
pub use models::*;
pub use registry::{JobRegistry, ReportStore};
pub use runner::{OperationOutput, OperationRunner, TestResult};
