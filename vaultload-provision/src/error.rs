//! Error types for provisioning

use thiserror::Error;

/// Failure of a single CLI command
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to invoke `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}\nOutput:\n{output}")]
    NonZeroExit {
        command: String,
        status: String,
        output: String,
    },

    #[error("`{command}` failed: {message}")]
    Failed { command: String, message: String },

    #[error("Command queue closed before the stage was fully dispatched")]
    QueueClosed,

    #[error("Stage aborted without a recorded command error")]
    Aborted,

    #[error("`{command}` did not run to completion: {message}")]
    Panicked { command: String, message: String },
}

impl CommandError {
    /// Captured output of the failing command, if any
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandError::NonZeroExit { output, .. } => Some(output),
            CommandError::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Errors from the tenant management API
#[derive(Error, Debug)]
pub enum TenantApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
}

/// Provisioning errors
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Stage {stage} failed after {completed_stages} completed stage(s): {source}")]
    StageFailed {
        stage: usize,
        completed_stages: usize,
        #[source]
        source: CommandError,
    },

    #[error("Path tree has no scopes to attach '{leaf}' to")]
    NoScopes { leaf: String },

    #[error("Tenant API error: {0}")]
    TenantApi(#[from] TenantApiError),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

impl ProvisionError {
    /// Index of the failing stage for stage failures
    pub fn failed_stage(&self) -> Option<usize> {
        match self {
            ProvisionError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
