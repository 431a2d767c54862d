//! Fan-out of load jobs to worker agents
//!
//! The aggregate rate is split evenly across the discovered agents, every
//! agent receives the same job with its share of the rate, and the replies are
//! gathered best-effort: an agent that fails, times out or answers with
//! garbage is logged and left out.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use vaultload_config::domains::load::MAX_LOAD_DURATION_SECS;
use vaultload_config::LoadConfig;

use crate::errors::LoadTestError;
use crate::metrics::MetricsSummary;

/// Job body sent to `POST {agent}/command`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadJobSpec {
    #[serde(alias = "Tenant")]
    pub tenant: String,
    #[serde(alias = "Domain")]
    pub domain: String,
    /// Requests per second
    #[serde(alias = "Rate")]
    pub rate: u64,
    /// Seconds
    #[serde(alias = "Duration")]
    pub duration: u64,
    #[serde(alias = "SecretPaths")]
    pub secret_paths: Vec<String>,
    #[serde(alias = "Tokens")]
    pub tokens: Vec<String>,
    #[serde(alias = "StaticTargeter")]
    pub static_targeter: bool,
    #[serde(alias = "Workers")]
    pub workers: usize,
}

impl LoadJobSpec {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration)
    }

    /// Copy of this job with a different rate
    pub fn with_rate(&self, rate: u64) -> Self {
        Self {
            rate,
            ..self.clone()
        }
    }

    /// Checks an agent performs before attacking
    pub fn validate(&self) -> Result<(), LoadTestError> {
        if self.tenant.trim().is_empty() {
            return Err(LoadTestError::InvalidJob("must specify tenant".to_string()));
        }
        if self.secret_paths.is_empty() {
            return Err(LoadTestError::InvalidJob(
                "no secret paths specified".to_string(),
            ));
        }
        if !self.static_targeter && self.tokens.is_empty() {
            return Err(LoadTestError::InvalidJob(
                "no auth tokens specified".to_string(),
            ));
        }
        if self.duration > MAX_LOAD_DURATION_SECS {
            return Err(LoadTestError::InvalidJob(format!(
                "duration has a max of {} seconds",
                MAX_LOAD_DURATION_SECS
            )));
        }
        Ok(())
    }
}

/// Reachable base address of a worker agent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerEndpoint(Url);

impl WorkerEndpoint {
    /// Accepts a full URL or a bare `host:port`, which is taken as plain HTTP
    pub fn parse(address: &str) -> Result<Self, LoadTestError> {
        let address = address.trim();
        let candidate = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };
        Url::parse(&candidate)
            .map(Self)
            .map_err(|e| LoadTestError::InvalidUrl(format!("{}: {}", address, e)))
    }

    fn join(&self, path: &str) -> String {
        format!("{}/{}", self.0.as_str().trim_end_matches('/'), path)
    }

    pub fn command_url(&self) -> String {
        self.join("command")
    }

    pub fn metrics_url(&self) -> String {
        self.join("metrics")
    }
}

impl fmt::Display for WorkerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str().trim_end_matches('/'))
    }
}

/// Discovery of worker agents
#[async_trait]
pub trait EndpointSource: Send + Sync {
    async fn endpoints(&self) -> Result<Vec<WorkerEndpoint>, LoadTestError>;
}

/// Fixed list of agents from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticEndpoints {
    endpoints: Vec<WorkerEndpoint>,
}

impl StaticEndpoints {
    pub fn new(endpoints: Vec<WorkerEndpoint>) -> Self {
        Self { endpoints }
    }

    pub fn parse<I, S>(addresses: I) -> Result<Self, LoadTestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = addresses
            .into_iter()
            .map(|address| WorkerEndpoint::parse(address.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(endpoints))
    }

    pub fn from_config(config: &LoadConfig) -> Result<Self, LoadTestError> {
        Self::parse(&config.endpoints)
    }
}

#[async_trait]
impl EndpointSource for StaticEndpoints {
    async fn endpoints(&self) -> Result<Vec<WorkerEndpoint>, LoadTestError> {
        Ok(self.endpoints.clone())
    }
}

/// Share of `rate` for each of `endpoints` agents, rounded down
pub fn per_endpoint_rate(rate: u64, endpoints: usize) -> u64 {
    rate / (endpoints.max(1) as u64)
}

/// Error wrapper an agent returns instead of metrics
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgentReply {
    Failure {
        #[serde(rename = "Error")]
        error: String,
    },
    Metrics(MetricsSummary),
}

/// Sends one job to every agent concurrently and collects their summaries
#[derive(Debug, Clone)]
pub struct FanOutDispatcher {
    client: Client,
    timeout_factor: f64,
}

impl FanOutDispatcher {
    pub fn new(client: Client, timeout_factor: f64) -> Self {
        Self {
            client,
            timeout_factor,
        }
    }

    pub fn from_config(client: Client, config: &LoadConfig) -> Self {
        Self::new(client, config.timeout_factor)
    }

    /// Per-agent timeout: the test duration scaled by the timeout factor
    pub fn request_timeout(&self, job: &LoadJobSpec) -> Duration {
        job.duration().mul_f64(self.timeout_factor.max(1.0))
    }

    /// Dispatch `job` to all `endpoints` and wait for every one to settle.
    ///
    /// Summaries come back in the order the agents answered, which is the
    /// order the aggregator must merge them in. Failed agents are omitted.
    pub async fn dispatch(
        &self,
        endpoints: &[WorkerEndpoint],
        job: &LoadJobSpec,
    ) -> Vec<MetricsSummary> {
        if endpoints.is_empty() {
            warn!("No worker endpoints available, skipping dispatch");
            return Vec::new();
        }

        let rate = per_endpoint_rate(job.rate, endpoints.len());
        info!(
            "Spreading total rate {} rps to {} rps across {} workers",
            job.rate,
            rate,
            endpoints.len()
        );

        let body = match serde_json::to_vec(&job.with_rate(rate)) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode load job: {}", e);
                return Vec::new();
            }
        };
        let timeout = self.request_timeout(job);

        let mut pending: FuturesUnordered<_> = endpoints
            .iter()
            .map(|endpoint| {
                let body = body.clone();
                async move { (endpoint, self.send_job(endpoint, body, timeout).await) }
            })
            .collect();

        let mut summaries = Vec::with_capacity(endpoints.len());
        while let Some((endpoint, result)) = pending.next().await {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!("Dropping results from worker {}: {}", endpoint, e),
            }
        }
        summaries
    }

    async fn send_job(
        &self,
        endpoint: &WorkerEndpoint,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<MetricsSummary, LoadTestError> {
        debug!("Sending job to worker {}", endpoint);

        let response = self
            .client
            .post(endpoint.command_url())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(LoadTestError::EndpointStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        decode_agent_reply(endpoint, &bytes)
    }
}

/// Decode an agent's metrics reply, rejecting the error wrapper
pub(crate) fn decode_agent_reply(
    endpoint: &WorkerEndpoint,
    bytes: &[u8],
) -> Result<MetricsSummary, LoadTestError> {
    match serde_json::from_slice::<AgentReply>(bytes)? {
        AgentReply::Metrics(summary) => Ok(summary),
        AgentReply::Failure { error } => Err(LoadTestError::EndpointRejected {
            endpoint: endpoint.to_string(),
            message: error,
        }),
    }
}
