//! In-memory state shared between runs

use std::collections::HashMap;
use tokio::sync::{watch, RwLock};
use vaultload_loadtest::{AggregateSummary, LoadJobSpec};

/// Load jobs produced by setup, keyed by tenant
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, LoadJobSpec>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the job for `job.tenant`, replacing any earlier one
    pub async fn register(&self, job: LoadJobSpec) {
        self.jobs.write().await.insert(job.tenant.clone(), job);
    }

    pub async fn get(&self, tenant: &str) -> Option<LoadJobSpec> {
        self.jobs.read().await.get(tenant).cloned()
    }

    pub async fn remove(&self, tenant: &str) -> Option<LoadJobSpec> {
        self.jobs.write().await.remove(tenant)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

/// Latest merged load test summary
#[derive(Debug)]
pub struct ReportStore {
    latest: watch::Sender<Option<AggregateSummary>>,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self { latest }
    }

    pub fn publish(&self, summary: AggregateSummary) {
        self.latest.send_replace(Some(summary));
    }

    pub fn latest(&self) -> Option<AggregateSummary> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AggregateSummary>> {
        self.latest.subscribe()
    }

    /// Publishing side, for [`vaultload_loadtest::MetricsPoller::run`]
    pub fn sender(&self) -> &watch::Sender<Option<AggregateSummary>> {
        &self.latest
    }
}
