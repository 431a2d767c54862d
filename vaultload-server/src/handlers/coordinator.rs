//! Coordinator endpoints: run operations and read the merged report

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;
use vaultload_loadtest::ReportTable;

use crate::{
    context::{CoordinatorContext, SummaryContext},
    errors::{RestError, RestResult},
    models::RunRequest,
};

/// `POST /command` with a JSON [`RunRequest`]; an empty body means no overrides
pub async fn run_command(
    State(ctx): State<CoordinatorContext>,
    body: Bytes,
) -> RestResult<Json<serde_json::Value>> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RunRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            RestError::bad_request(format!("Error assembling required parameters: {}", e))
        })?
    };
    execute(ctx, request).await
}

/// `GET /command?operation=...` with the same fields as query parameters
pub async fn run_command_query(
    State(ctx): State<CoordinatorContext>,
    query: Result<Query<RunRequest>, QueryRejection>,
) -> RestResult<Json<serde_json::Value>> {
    let Query(request) = query.map_err(|e| {
        RestError::bad_request(format!("Error assembling required parameters: {}", e))
    })?;
    execute(ctx, request).await
}

async fn execute(
    ctx: CoordinatorContext,
    request: RunRequest,
) -> RestResult<Json<serde_json::Value>> {
    let (operation, config) = request.resolve(&ctx.config)?;
    info!("operation: {}", operation);

    let output = ctx.runner.run(operation, &config).await?;
    output
        .to_json(config.server.redash)
        .map(Json)
        .map_err(|e| RestError::internal_error(e.to_string()))
}

/// `GET /summary`: the latest merged summary of any test run
pub async fn get_summary(State(ctx): State<SummaryContext>) -> RestResult<Response> {
    let summary = ctx
        .reports
        .latest()
        .ok_or_else(|| RestError::not_found("no load test results yet"))?;

    if ctx.redash {
        Ok(Json(ReportTable::from_summary(&summary)).into_response())
    } else {
        Ok(Json(summary).into_response())
    }
}
