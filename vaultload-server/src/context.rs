//! Handler state for the coordinator and agent routers

use axum::extract::FromRef;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use vaultload_config::{ProvisionConfig, VaultloadConfig};
use vaultload_loadtest::{
    secrets_base_url, AttackPlan, Attacker, LoadJobSpec, MetricsSummary, Targeter,
};

use crate::errors::{RestError, RestResult};
use crate::registry::ReportStore;
use crate::runner::OperationRunner;

/// Read side of the merged report
#[derive(Clone)]
pub struct SummaryContext {
    pub reports: Arc<ReportStore>,
    /// Serve the dashboard table instead of the raw summary
    pub redash: bool,
}

impl SummaryContext {
    pub fn new(reports: Arc<ReportStore>, redash: bool) -> Self {
        Self { reports, redash }
    }
}

/// State of the coordinator API
#[derive(Clone)]
pub struct CoordinatorContext {
    /// Base configuration each request's overrides are applied to
    pub config: Arc<VaultloadConfig>,
    pub runner: Arc<OperationRunner>,
    pub summary: SummaryContext,
}

impl CoordinatorContext {
    pub fn new(config: VaultloadConfig, runner: OperationRunner) -> Self {
        let summary = SummaryContext::new(runner.reports(), config.server.redash);
        Self {
            config: Arc::new(config),
            runner: Arc::new(runner),
            summary,
        }
    }
}

impl FromRef<CoordinatorContext> for SummaryContext {
    fn from_ref(ctx: &CoordinatorContext) -> Self {
        ctx.summary.clone()
    }
}

/// State of a worker agent
#[derive(Clone)]
pub struct AgentContext {
    pub attacker: Arc<dyn Attacker>,
    provision: Arc<ProvisionConfig>,
    /// Concurrency used when a job does not name one
    pub default_workers: usize,
    last: Arc<RwLock<Option<MetricsSummary>>>,
}

impl AgentContext {
    pub fn new(attacker: Arc<dyn Attacker>, config: &VaultloadConfig) -> Self {
        Self {
            attacker,
            provision: Arc::new(config.provision.clone()),
            default_workers: config.load.workers,
            last: Arc::new(RwLock::new(None)),
        }
    }

    /// `{tenant base}/secrets` for the job's tenant and domain
    pub fn target_root(&self, job: &LoadJobSpec) -> String {
        let mut provision = self.provision.as_ref().clone();
        if !job.domain.is_empty() {
            provision.domain = job.domain.clone();
        }
        secrets_base_url(&provision.tenant_base_url(&job.tenant))
    }

    /// Validate `job`, attack its tenant and keep the summary as the latest result
    pub async fn run_job(&self, job: &LoadJobSpec) -> RestResult<MetricsSummary> {
        job.validate()
            .map_err(|e| RestError::bad_request(e.to_string()))?;

        let root = self.target_root(job);
        info!(
            "Preparing targeting for {} ({} paths, static: {})",
            root,
            job.secret_paths.len(),
            job.static_targeter
        );
        let targeter = if job.static_targeter {
            Targeter::static_paths(&root, job.secret_paths.clone())?
        } else {
            Targeter::dynamic(&root, job.secret_paths.clone(), job.tokens.clone())?
        };

        let plan = AttackPlan {
            targeter,
            rate: job.rate,
            duration: job.duration(),
            workers: if job.workers == 0 {
                self.default_workers
            } else {
                job.workers
            },
        };
        let summary = self.attacker.attack(plan).await?;
        self.set_last_summary(summary.clone()).await;
        Ok(summary)
    }

    pub async fn last_summary(&self) -> Option<MetricsSummary> {
        self.last.read().await.clone()
    }

    pub async fn set_last_summary(&self, summary: MetricsSummary) {
        *self.last.write().await = Some(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultload_loadtest::HttpAttacker;

    fn agent(config: &VaultloadConfig) -> AgentContext {
        AgentContext::new(Arc::new(HttpAttacker::new(reqwest::Client::new())), config)
    }

    #[test]
    fn test_target_root_uses_job_domain() {
        let config = VaultloadConfig::default();
        let job = LoadJobSpec {
            tenant: "acme".to_string(),
            domain: "example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(agent(&config).target_root(&job), "https://acme.example.com/secrets");

        let job = LoadJobSpec {
            domain: String::new(),
            ..job
        };
        assert_eq!(
            agent(&config).target_root(&job),
            format!("https://acme.{}/secrets", config.provision.domain)
        );
    }

    #[test]
    fn test_target_root_base_override() {
        let mut config = VaultloadConfig::default();
        config.provision.tenant_base_url = Some("http://127.0.0.1:9000/".to_string());
        let job = LoadJobSpec {
            tenant: "acme".to_string(),
            ..Default::default()
        };
        assert_eq!(agent(&config).target_root(&job), "http://127.0.0.1:9000/secrets");
    }
}
