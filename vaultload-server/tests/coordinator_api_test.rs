use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use vaultload_config::VaultloadConfig;
use vaultload_loadtest::{EndpointSource, LoadJobSpec, LoadTestError, StaticEndpoints, WorkerEndpoint};
use vaultload_provision::{Command, CommandError, CommandRunner};
use vaultload_server::{create_coordinator_app, CoordinatorContext, OperationRunner};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stands in for the secrets store CLI; fails any command whose arguments contain `fail_on`
struct FakeCli {
    fail_on: Option<&'static str>,
}

#[async_trait]
impl CommandRunner for FakeCli {
    async fn run(&self, command: &Command) -> Result<Vec<u8>, CommandError> {
        let rendered = command.to_string();
        if let Some(marker) = self.fail_on {
            if rendered.contains(marker) {
                return Err(CommandError::NonZeroExit {
                    command: rendered,
                    status: "exit status: 1".to_string(),
                    output: "denied".to_string(),
                });
            }
        }
        match command {
            Command::CreateToken { username, .. } => {
                Ok(format!(r#"{{"accessToken":"tok-{}"}}"#, username).into_bytes())
            }
            _ => Ok(Vec::new()),
        }
    }
}

struct BrokenDiscovery;

#[async_trait]
impl EndpointSource for BrokenDiscovery {
    async fn endpoints(&self) -> Result<Vec<WorkerEndpoint>, LoadTestError> {
        Err(LoadTestError::Discovery("no cluster access".to_string()))
    }
}

struct Harness {
    server: TestServer,
    admin: MockServer,
    agent: MockServer,
}

async fn mock_admin() -> MockServer {
    let admin = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&admin)
        .await;
    Mock::given(method("POST"))
        .and(path("/initialize"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&admin)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/tenant/acme"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&admin)
        .await;
    admin
}

async fn mock_agent() -> MockServer {
    let agent = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/command"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latencies": {"total": 500.0, "mean": 5.0, "50th": 4.0, "95th": 9.0, "99th": 12.0, "max": 15.0},
            "duration": 1.0,
            "requests": 100,
            "rate": 100.0,
            "success": 1.0,
            "status_codes": {"200": 100},
            "errors": []
        })))
        .mount(&agent)
        .await;
    agent
}

fn config(admin: &MockServer) -> VaultloadConfig {
    let mut config = VaultloadConfig::default();
    config.provision.admin_endpoint = admin.uri();
    config.provision.tenant_base_url = Some(admin.uri());
    config.provision.users = 2;
    config.provision.secrets = 4;
    config.provision.permissions = 2;
    config.provision.workers = 2;
    config.load.rate = 10;
    config.load.duration = Duration::from_secs(1);
    config
}

async fn harness_with(cli: FakeCli, endpoints: Option<Arc<dyn EndpointSource>>) -> Harness {
    let admin = mock_admin().await;
    let agent = mock_agent().await;

    let endpoints = endpoints
        .unwrap_or_else(|| Arc::new(StaticEndpoints::parse([agent.uri()]).unwrap()));
    let runner = OperationRunner::new(reqwest::Client::new(), Arc::new(cli), endpoints);
    let ctx = CoordinatorContext::new(config(&admin), runner);

    Harness {
        server: TestServer::new(create_coordinator_app(ctx)).unwrap(),
        admin,
        agent,
    }
}

async fn harness() -> Harness {
    harness_with(FakeCli { fail_on: None }, None).await
}

async fn requests_to(server: &MockServer, verb: &str, route: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.to_string() == verb && r.url.path() == route)
        .collect()
}

#[tokio::test]
async fn test_full_operation_round_trip() {
    let h = harness().await;

    let response = h
        .server
        .post("/command")
        .json(&json!({"operation": "full", "tenant": "Acme"}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["Error"], "");
    let data = body["Data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["requests"], 100);

    // the agent got the whole rate, every secret path and one token per user
    let jobs = requests_to(&h.agent, "POST", "/command").await;
    assert_eq!(jobs.len(), 1);
    let job: LoadJobSpec = serde_json::from_slice(&jobs[0].body).unwrap();
    assert_eq!(job.tenant, "acme");
    assert_eq!(job.rate, 10);
    assert_eq!(job.duration, 1);
    assert_eq!(job.secret_paths.len(), 4);
    assert_eq!(job.tokens.len(), 2);
    assert!(job.tokens.iter().all(|t| t.starts_with("tok-")));

    assert_eq!(requests_to(&h.admin, "POST", "/tenant").await.len(), 1);
    assert_eq!(requests_to(&h.admin, "POST", "/initialize").await.len(), 1);
    assert_eq!(requests_to(&h.admin, "DELETE", "/tenant/acme").await.len(), 1);

    let summary: Value = h.server.get("/summary").await.json();
    assert_eq!(summary["requests"], 100);
    assert_eq!(summary["success"], true);
}

#[tokio::test]
async fn test_setup_then_test_by_query_string() {
    let h = harness().await;

    let response = h
        .server
        .post("/command")
        .json(&json!({"Operation": "setup", "Tenant": "acme"}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"tenant": "acme"}));

    let response = h
        .server
        .get("/command")
        .add_query_param("operation", "test")
        .add_query_param("tenant", "acme")
        .add_query_param("loadRate", "40")
        .add_query_param("redash", "true")
        .await;
    response.assert_status_ok();

    let table: Value = response.json();
    assert_eq!(table["columns"].as_array().unwrap().len(), 12);
    assert_eq!(table["rows"][0]["requests"], 100);

    let jobs = requests_to(&h.agent, "POST", "/command").await;
    let job: LoadJobSpec = serde_json::from_slice(&jobs[0].body).unwrap();
    assert_eq!(job.rate, 40);

    // setup alone never tears down
    assert!(requests_to(&h.admin, "DELETE", "/tenant/acme").await.is_empty());
}

#[tokio::test]
async fn test_setup_generates_tenant_name() {
    let h = harness().await;

    let response = h
        .server
        .post("/command")
        .json(&json!({"operation": "setup"}))
        .await;
    response.assert_status_ok();

    let tenant = response.json::<Value>()["tenant"].as_str().unwrap().to_string();
    assert!(!tenant.is_empty());
    assert_eq!(tenant, tenant.to_lowercase());
}

#[tokio::test]
async fn test_test_without_setup_fails() {
    let h = harness().await;

    let response = h
        .server
        .post("/command")
        .json(&json!({"operation": "test", "tenant": "ghost"}))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json::<Value>()["Error"]
        .as_str()
        .unwrap()
        .contains("failed to load test model for tenant: ghost"));
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let h = harness().await;

    for body in [
        json!({"operation": "destroy"}),
        json!({"operation": "teardown"}),
        json!({"operation": "full", "loadDuration": 3001}),
    ] {
        let response = h.server.post("/command").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["Error"].is_string());
    }

    let response = h.server.post("/command").text("{not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // no operation at all
    let response = h.server.post("/command").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    assert!(requests_to(&h.admin, "POST", "/tenant").await.is_empty());
}

#[tokio::test]
async fn test_summary_before_any_test() {
    let h = harness().await;

    let response = h.server.get("/summary").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = h.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_failed_stage_aborts_setup() {
    let h = harness_with(FakeCli { fail_on: Some("permission") }, None).await;

    let response = h
        .server
        .post("/command")
        .json(&json!({"operation": "full", "tenant": "acme"}))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let error = response.json::<Value>()["Error"].as_str().unwrap().to_string();
    assert!(error.contains("Stage 6 failed"), "{}", error);
    assert!(error.contains("denied"), "{}", error);

    // nothing was dispatched and nothing torn down
    assert!(requests_to(&h.agent, "POST", "/command").await.is_empty());
    assert!(requests_to(&h.admin, "DELETE", "/tenant/acme").await.is_empty());
}

#[tokio::test]
async fn test_full_tears_down_after_failed_test() {
    let h = harness_with(FakeCli { fail_on: None }, Some(Arc::new(BrokenDiscovery))).await;

    let response = h
        .server
        .post("/command")
        .json(&json!({"operation": "full", "tenant": "acme"}))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json::<Value>()["Error"]
        .as_str()
        .unwrap()
        .contains("no cluster access"));

    assert_eq!(requests_to(&h.admin, "DELETE", "/tenant/acme").await.len(), 1);
}
