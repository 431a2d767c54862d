//! Router setup and serving

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    context::{AgentContext, CoordinatorContext, SummaryContext},
    handlers,
};

/// Coordinator API: run operations and expose the merged report
pub fn create_coordinator_app(ctx: CoordinatorContext) -> Router {
    Router::new()
        .route("/health", get(handlers::coordinator_health))
        .route(
            "/command",
            post(handlers::run_command).get(handlers::run_command_query),
        )
        .route(
            "/summary",
            get(handlers::get_summary).layer(summary_cors_layer()),
        )
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
}

/// Worker agent API: accept load jobs and report their metrics
pub fn create_agent_app(ctx: AgentContext) -> Router {
    Router::new()
        .route("/health", get(handlers::agent_health))
        .route("/command", post(handlers::run_load_job))
        .route("/metrics", get(handlers::agent_metrics))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
}

/// Standalone report of the merged summary, served at `/` and `/summary`
pub fn create_summary_app(ctx: SummaryContext) -> Router {
    Router::new()
        .route("/", get(handlers::get_summary))
        .route("/summary", get(handlers::get_summary))
        .route("/health", get(handlers::coordinator_health))
        .with_state(ctx)
        .layer(summary_cors_layer())
}

/// Read-only report of one local attack, served at `/` and `/metrics`
pub fn create_report_app(ctx: AgentContext) -> Router {
    Router::new()
        .route("/", get(handlers::agent_metrics))
        .route("/metrics", get(handlers::agent_metrics))
        .with_state(ctx)
        .layer(summary_cors_layer())
}

/// Dashboards read the summary cross-origin
fn summary_cors_layer() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_methods(Any)
}

/// Bind `addr` and serve `app` until `shutdown` is cancelled
pub async fn serve(addr: SocketAddr, app: Router, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
pub async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }

    info!("Shutdown signal received, starting graceful shutdown...");
    shutdown.cancel();
}
