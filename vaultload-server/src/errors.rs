//! REST error type and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use vaultload_loadtest::LoadTestError;
use vaultload_provision::{ProvisionError, TenantApiError};

/// Errors surfaced by the coordinator and agent APIs
#[derive(Error, Debug)]
pub enum RestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("failed to load test model for tenant: {tenant}")]
    UnknownJob { tenant: String },

    #[error("setup failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("tenant API failed: {0}")]
    TenantApi(#[from] TenantApiError),

    #[error("error running load test: {0}")]
    LoadTest(#[from] LoadTestError),

    #[error("{0}")]
    InternalError(String),
}

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

impl RestError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        RestError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        RestError::NotFound(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        RestError::InternalError(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(json!({ "Error": self.to_string() }))).into_response()
    }
}
