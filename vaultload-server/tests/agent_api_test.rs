use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use vaultload_config::VaultloadConfig;
use vaultload_loadtest::HttpAttacker;
use vaultload_server::{create_agent_app, create_report_app, AgentContext};
use wiremock::matchers::{header_regex, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answers secret reads; with `tokens` set, only reads carrying one of the test tokens
async fn secrets_store(tokens: bool) -> MockServer {
    let store = MockServer::start().await;
    let read = Mock::given(method("GET")).and(path_regex("^/secrets/.+"));
    let read = if tokens {
        read.and(header_regex("authorization", "^tok-(a|b)$"))
    } else {
        read
    };
    read.respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "x"})))
        .mount(&store)
        .await;
    store
}

fn agent_context(store: &MockServer) -> AgentContext {
    let mut config = VaultloadConfig::default();
    config.provision.tenant_base_url = Some(store.uri());
    config.load.workers = 4;
    AgentContext::new(Arc::new(HttpAttacker::new(reqwest::Client::new())), &config)
}

#[tokio::test]
async fn test_agent_runs_dynamic_job() {
    let store = secrets_store(true).await;
    let ctx = agent_context(&store);
    let server = TestServer::new(create_agent_app(ctx)).unwrap();

    server.get("/metrics").await.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post("/command")
        .json(&json!({
            "tenant": "acme",
            "rate": 20,
            "duration": 1,
            "secretPaths": ["10.0.0.1/1.2.3.4", "10.0.0.2/5.6.7.8"],
            "tokens": ["tok-a", "tok-b"]
        }))
        .await;
    response.assert_status_ok();

    let summary: Value = response.json();
    assert_eq!(summary["requests"], 20);
    assert_eq!(summary["success"], 1.0);
    assert_eq!(summary["status_codes"]["200"], 20);

    // every request carried one of the tokens, otherwise the store answers 404
    assert_eq!(store.received_requests().await.unwrap().len(), 20);

    // the last result stays available
    let metrics: Value = server.get("/metrics").await.json();
    assert_eq!(metrics["requests"], 20);
}

#[tokio::test]
async fn test_agent_static_job_without_tokens() {
    let store = secrets_store(false).await;
    let server = TestServer::new(create_agent_app(agent_context(&store))).unwrap();

    let response = server
        .post("/command")
        .json(&json!({
            "Tenant": "acme",
            "Rate": 5,
            "Duration": 1,
            "SecretPaths": ["/only/path"],
            "StaticTargeter": true
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["requests"], 5);

    let received = store.received_requests().await.unwrap();
    assert!(received.iter().all(|r| r.url.path() == "/secrets/only/path"));
}

#[tokio::test]
async fn test_agent_rejects_invalid_jobs() {
    let store = secrets_store(false).await;
    let server = TestServer::new(create_agent_app(agent_context(&store))).unwrap();

    for body in [
        json!({"secretPaths": ["a"], "tokens": ["t"], "rate": 1, "duration": 1}),
        json!({"tenant": "acme", "tokens": ["t"], "rate": 1, "duration": 1}),
        json!({"tenant": "acme", "secretPaths": ["a"], "rate": 1, "duration": 1}),
        json!({"tenant": "acme", "secretPaths": ["a"], "tokens": ["t"], "duration": 3001}),
    ] {
        let response = server.post("/command").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["Error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid load job"));
    }

    server
        .post("/command")
        .text("garbage")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert!(store.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_report_app_serves_last_summary() {
    let store = secrets_store(false).await;
    let ctx = agent_context(&store);
    let server = TestServer::new(create_report_app(ctx.clone())).unwrap();

    server.get("/").await.assert_status(StatusCode::NOT_FOUND);

    ctx.set_last_summary(vaultload_loadtest::MetricsSummary {
        requests: 7,
        success: 1.0,
        ..Default::default()
    })
    .await;

    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["requests"], 7);
    assert_eq!(server.get("/health").await.status_code(), StatusCode::NOT_FOUND);
}
