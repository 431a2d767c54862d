//! Load test error types

/// Error type for load test operations
#[derive(Debug, thiserror::Error)]
pub enum LoadTestError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid HTTP method in target: '{0}'")]
    InvalidMethod(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Target stream error: {0}")]
    TargetStream(#[from] std::io::Error),

    #[error("Invalid load job: {0}")]
    InvalidJob(String),

    #[error("Worker {endpoint} returned HTTP {status}: {body}")]
    EndpointStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Worker {endpoint} rejected the job: {message}")]
    EndpointRejected { endpoint: String, message: String },

    #[error("Endpoint discovery failed: {0}")]
    Discovery(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}
