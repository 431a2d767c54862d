//! End-to-end test of a distributed load test.
//!
//! Two real agents listen on loopback ports and attack a mocked secrets
//! store. The coordinator provisions a tenant through a fake CLI and fans the
//! job out to both agents. A metrics poller then merges what the agents
//! report and the summary app serves the result.

use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use vaultload_config::VaultloadConfig;
use vaultload_loadtest::{HttpAttacker, MetricsPoller, StaticEndpoints};
use vaultload_provision::{Command, CommandError, CommandRunner};
use vaultload_server::{
    create_agent_app, create_coordinator_app, create_summary_app, AgentContext,
    CoordinatorContext, OperationRunner, ReportStore, SummaryContext,
};
use wiremock::matchers::{header_regex, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FakeCli;

#[async_trait]
impl CommandRunner for FakeCli {
    async fn run(&self, command: &Command) -> Result<Vec<u8>, CommandError> {
        match command {
            Command::CreateToken { username, .. } => {
                Ok(format!(r#"{{"accessToken":"tok-{}"}}"#, username).into_bytes())
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Tenant API plus secret reads that require a provisioned token
async fn tenant_backend() -> MockServer {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/initialize"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&backend)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/tenant/acme"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/secrets/.+"))
        .and(header_regex("authorization", "^tok-"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "s3cr3t"})))
        .mount(&backend)
        .await;
    backend
}

fn config(backend: &MockServer) -> VaultloadConfig {
    let mut config = VaultloadConfig::default();
    config.provision.admin_endpoint = backend.uri();
    config.provision.tenant_base_url = Some(backend.uri());
    config.provision.users = 3;
    config.provision.secrets = 6;
    config.provision.permissions = 2;
    config.load.rate = 20;
    config.load.duration = Duration::from_secs(1);
    config.load.workers = 4;
    config
}

/// Serve an agent on an ephemeral loopback port until `shutdown` fires
async fn spawn_agent(config: &VaultloadConfig, shutdown: CancellationToken) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let ctx = AgentContext::new(Arc::new(HttpAttacker::new(reqwest::Client::new())), config);
    let app = create_agent_app(ctx);
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    });
    Ok(addr)
}

async fn secret_reads(backend: &MockServer) -> usize {
    backend
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().starts_with("/secrets/"))
        .count()
}

#[tokio::test]
async fn test_full_run_across_two_agents() -> Result<()> {
    let backend = tenant_backend().await;
    let config = config(&backend);
    let shutdown = CancellationToken::new();

    let agents = vec![
        spawn_agent(&config, shutdown.clone()).await?,
        spawn_agent(&config, shutdown.clone()).await?,
    ];
    let endpoints = Arc::new(StaticEndpoints::parse(agents.iter().map(|a| a.to_string()))?);

    let runner = OperationRunner::new(reqwest::Client::new(), Arc::new(FakeCli), endpoints.clone());
    let coordinator = TestServer::new(create_coordinator_app(CoordinatorContext::new(
        config.clone(),
        runner,
    )))?;

    let response = coordinator
        .post("/command")
        .json(&json!({"operation": "full", "tenant": "acme"}))
        .await;
    response.assert_status_ok();

    // the rate is split evenly and every read carried a token
    let body: Value = response.json();
    let per_agent = body["Data"].as_array().unwrap();
    assert_eq!(per_agent.len(), 2);
    for summary in per_agent {
        assert_eq!(summary["requests"], 10);
        assert_eq!(summary["success"], 1.0);
    }
    assert_eq!(secret_reads(&backend).await, 20);

    let merged: Value = coordinator.get("/summary").await.json();
    assert_eq!(merged["requests"], 20);
    assert_eq!(merged["success"], true);
    assert_eq!(merged["statusCodes"]["200"], 20);

    // the agents keep their last result for pollers
    let reports = Arc::new(ReportStore::new());
    let mut updates = reports.subscribe();
    let cancel = CancellationToken::new();
    let polling = {
        let reports = reports.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            MetricsPoller::new(reqwest::Client::new())
                .run(endpoints, Duration::from_millis(50), reports.sender(), cancel)
                .await
        })
    };
    tokio::time::timeout(Duration::from_secs(5), updates.changed()).await??;
    cancel.cancel();
    polling.await?;

    let summary = TestServer::new(create_summary_app(SummaryContext::new(reports, false)))?;
    let response = summary.get("/").await;
    response.assert_status_ok();
    let polled: Value = response.json();
    assert_eq!(polled["requests"], 20);
    assert_eq!(polled["rate"], merged["rate"]);

    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn test_unreachable_agent_is_left_out() -> Result<()> {
    let backend = tenant_backend().await;
    let config = config(&backend);
    let shutdown = CancellationToken::new();

    let live = spawn_agent(&config, shutdown.clone()).await?;
    // bound then dropped, so nothing listens there
    let dead = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;

    let endpoints = Arc::new(StaticEndpoints::parse([live.to_string(), dead.to_string()])?);
    let runner = OperationRunner::new(reqwest::Client::new(), Arc::new(FakeCli), endpoints);
    let coordinator = TestServer::new(create_coordinator_app(CoordinatorContext::new(
        config, runner,
    )))?;

    coordinator
        .post("/command")
        .json(&json!({"operation": "setup", "tenant": "acme"}))
        .await
        .assert_status_ok();

    let response = coordinator
        .post("/command")
        .json(&json!({"operation": "test", "tenant": "acme"}))
        .await;
    response.assert_status_ok();

    // each agent was offered half the rate; only one answered
    let per_agent = response.json::<Value>()["Data"].as_array().unwrap().clone();
    assert_eq!(per_agent.len(), 1);
    assert_eq!(per_agent[0]["requests"], 10);

    let merged: Value = coordinator.get("/summary").await.json();
    assert_eq!(merged["requests"], 10);

    coordinator
        .post("/command")
        .json(&json!({"operation": "teardown", "tenant": "acme"}))
        .await
        .assert_status_ok();

    // the job is gone with the tenant
    coordinator
        .post("/command")
        .json(&json!({"operation": "test", "tenant": "acme"}))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    shutdown.cancel();
    Ok(())
}
