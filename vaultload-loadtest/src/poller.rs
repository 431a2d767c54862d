//! Periodic collection of agent metrics

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregate::{AggregateSummary, MetricsAggregator};
use crate::dispatch::{decode_agent_reply, EndpointSource, WorkerEndpoint};
use crate::errors::LoadTestError;
use crate::metrics::MetricsSummary;

/// Reads `GET {agent}/metrics` from every agent
#[derive(Debug, Clone)]
pub struct MetricsPoller {
    client: Client,
}

impl MetricsPoller {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Poll every agent once, in reply order; agents without a usable reply are skipped
    pub async fn poll_once(&self, endpoints: &[WorkerEndpoint]) -> Vec<MetricsSummary> {
        let mut pending: FuturesUnordered<_> = endpoints
            .iter()
            .map(|endpoint| async move { (endpoint, self.fetch(endpoint).await) })
            .collect();

        let mut summaries = Vec::with_capacity(endpoints.len());
        while let Some((endpoint, result)) = pending.next().await {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => debug!("No metrics from {}: {}", endpoint, e),
            }
        }
        summaries
    }

    async fn fetch(&self, endpoint: &WorkerEndpoint) -> Result<MetricsSummary, LoadTestError> {
        let response = self.client.get(endpoint.metrics_url()).send().await?;
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

    /// Poll on `period` until cancelled, publishing each merged summary
    pub async fn run(
        &self,
        source: Arc<dyn EndpointSource>,
        period: Duration,
        latest: &watch::Sender<Option<AggregateSummary>>,
        cancel: CancellationToken,
    ) {
        info!("Polling worker metrics every {}s", period.as_secs());
        loop {
            let started = Instant::now();

            match source.endpoints().await {
                Ok(endpoints) => {
                    let parts = self.poll_once(&endpoints).await;
                    debug!("Merged metrics from {} of {} workers", parts.len(), endpoints.len());
                    latest.send_replace(Some(MetricsAggregator::merge_all(&parts)));
                }
                Err(e) => warn!("Endpoint discovery failed: {}", e),
            }

            let remaining = period.saturating_sub(started.elapsed());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(remaining) => {}
            }
        }
        info!("Metrics polling stopped");
    }
}
