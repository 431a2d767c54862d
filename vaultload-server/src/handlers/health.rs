//! Health check endpoints

use axum::{response::IntoResponse, Json};
use tracing::debug;

use crate::models::HealthResponse;

pub async fn coordinator_health() -> impl IntoResponse {
    debug!("Health check requested");
    Json(HealthResponse::healthy("coordinator"))
}

pub async fn agent_health() -> impl IntoResponse {
    debug!("Health check requested");
    Json(HealthResponse::healthy("agent"))
}
