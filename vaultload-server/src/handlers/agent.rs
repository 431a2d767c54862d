//! Worker agent endpoints

use axum::{body::Bytes, extract::State, Json};
use vaultload_loadtest::{LoadJobSpec, MetricsSummary};

use crate::{
    context::AgentContext,
    errors::{RestError, RestResult},
};

/// `POST /command`: run one attack and answer with its summary
pub async fn run_load_job(
    State(ctx): State<AgentContext>,
    body: Bytes,
) -> RestResult<Json<MetricsSummary>> {
    let job: LoadJobSpec = if body.iter().all(u8::is_ascii_whitespace) {
        LoadJobSpec::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| RestError::bad_request(e.to_string()))?
    };
    ctx.run_job(&job).await.map(Json)
}

/// `GET /metrics`: summary of the last completed attack
pub async fn agent_metrics(State(ctx): State<AgentContext>) -> RestResult<Json<MetricsSummary>> {
    ctx.last_summary()
        .await
        .map(Json)
        .ok_or_else(|| RestError::not_found("no completed load test"))
}
