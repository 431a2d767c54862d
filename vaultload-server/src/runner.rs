//! Setup, test and teardown of a tenant

use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};
use vaultload_config::VaultloadConfig;
use vaultload_loadtest::{
    build_client, AggregateSummary, EndpointSource, FanOutDispatcher, LoadJobSpec,
    MetricsAggregator, MetricsSummary, ReportTable, StaticEndpoints,
};
use vaultload_provision::{
    random, CliRunner, CommandRunner, Pipeline, PlanSettings, ProvisionPlan, TenantClient,
};

use crate::errors::{RestError, RestResult};
use crate::models::{Operation, RespWrapper};
use crate::registry::{JobRegistry, ReportStore};

/// Results of one load test
#[derive(Debug, Clone)]
pub struct TestResult {
    pub tenant: String,
    /// One summary per agent that answered
    pub agents: Vec<MetricsSummary>,
    pub summary: AggregateSummary,
}

/// What the last step of an operation produced
#[derive(Debug, Clone)]
pub enum OperationOutput {
    Setup { tenant: String },
    Test(TestResult),
    Teardown { tenant: String },
}

impl OperationOutput {
    pub fn tenant(&self) -> &str {
        match self {
            OperationOutput::Setup { tenant } | OperationOutput::Teardown { tenant } => tenant,
            OperationOutput::Test(result) => &result.tenant,
        }
    }

    /// Response body: the tenant name for setup and teardown; for a test the
    /// agents' summaries, or the dashboard table when `redash` is set
    pub fn to_json(&self, redash: bool) -> serde_json::Result<serde_json::Value> {
        match self {
            OperationOutput::Test(result) if redash => {
                serde_json::to_value(ReportTable::from_summary(&result.summary))
            }
            OperationOutput::Test(result) => serde_json::to_value(RespWrapper::data(&result.agents)),
            other => Ok(serde_json::json!({ "tenant": other.tenant() })),
        }
    }
}

/// Runs operations against tenants; shared by the coordinator and the CLI
pub struct OperationRunner {
    client: Client,
    commands: Arc<dyn CommandRunner>,
    endpoints: Arc<dyn EndpointSource>,
    jobs: Arc<JobRegistry>,
    reports: Arc<ReportStore>,
}

impl OperationRunner {
    pub fn new(
        client: Client,
        commands: Arc<dyn CommandRunner>,
        endpoints: Arc<dyn EndpointSource>,
    ) -> Self {
        Self {
            client,
            commands,
            endpoints,
            jobs: Arc::new(JobRegistry::new()),
            reports: Arc::new(ReportStore::new()),
        }
    }

    /// Runner using the configured CLI binary and static worker list
    pub fn from_config(config: &VaultloadConfig) -> RestResult<Self> {
        let client = build_client(&config.http)?;
        let commands = Arc::new(CliRunner::from_config(&config.provision.cli));
        let endpoints = Arc::new(StaticEndpoints::from_config(&config.load)?);
        Ok(Self::new(client, commands, endpoints))
    }

    pub fn jobs(&self) -> Arc<JobRegistry> {
        self.jobs.clone()
    }

    pub fn reports(&self) -> Arc<ReportStore> {
        self.reports.clone()
    }

    /// Run `operation` with `config`.
    ///
    /// A blank tenant gets a random name when the operation creates one. For
    /// `full`, teardown still runs when the test step fails and the test
    /// error is returned afterwards.
    pub async fn run(
        &self,
        operation: Operation,
        config: &VaultloadConfig,
    ) -> RestResult<OperationOutput> {
        let mut tenant = config.provision.tenant.clone();
        if tenant.is_empty() && operation.includes_setup() {
            tenant = random::tenant_name(&mut rand::rng());
            info!("Blank tenant name, generated random: {}", tenant);
        }
        info!("Running {} for tenant '{}'", operation, tenant);

        let mut output = None;
        if operation.includes_setup() {
            let job = self.setup(&tenant, config).await?;
            self.jobs.register(job).await;
            output = Some(OperationOutput::Setup {
                tenant: tenant.clone(),
            });
        }

        let mut failure = None;
        if operation.includes_test() {
            match self.test(&tenant, config).await {
                Ok(result) => output = Some(OperationOutput::Test(result)),
                Err(e) => {
                    warn!("Load test for '{}' failed: {}", tenant, e);
                    failure = Some(e);
                }
            }
        }

        if operation.includes_teardown() {
            self.teardown(&tenant, config).await?;
            if output.is_none() {
                output = Some(OperationOutput::Teardown {
                    tenant: tenant.clone(),
                });
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }
        output.ok_or_else(|| RestError::internal_error(format!("{} produced no output", operation)))
    }

    /// Create the tenant, populate it and return the job that will attack it
    pub async fn setup(&self, tenant: &str, config: &VaultloadConfig) -> RestResult<LoadJobSpec> {
        info!("---Starting setup task");
        TenantClient::with_client(self.client.clone(), &config.provision)
            .provision(tenant)
            .await?;

        let settings = PlanSettings::from_config(&config.provision, tenant);
        let ProvisionPlan {
            commands,
            secret_paths,
            ..
        } = ProvisionPlan::generate(&settings, &mut rand::rng())?;

        let pipeline = Pipeline::new(self.commands.clone(), config.provision.workers)?;
        let report = pipeline.run(commands).await?;
        info!(
            "Populated tenant '{}': {} stages, {} secrets, {} tokens",
            tenant,
            report.completed_stages,
            secret_paths.len(),
            report.tokens.len()
        );

        info!("---Finished setup task");
        Ok(LoadJobSpec {
            tenant: tenant.to_string(),
            domain: config.provision.domain.clone(),
            rate: config.load.rate,
            duration: config.load.duration.as_secs(),
            secret_paths,
            tokens: report.tokens,
            static_targeter: config.load.static_targeter,
            workers: config.load.workers,
        })
    }

    /// Fan the tenant's job out to every agent and merge what comes back
    pub async fn test(&self, tenant: &str, config: &VaultloadConfig) -> RestResult<TestResult> {
        info!("---Starting test task");
        let job = self
            .jobs
            .get(tenant)
            .await
            .ok_or_else(|| RestError::UnknownJob {
                tenant: tenant.to_string(),
            })?;
        let job = LoadJobSpec {
            duration: config.load.duration.as_secs(),
            static_targeter: config.load.static_targeter,
            ..job.with_rate(config.load.rate)
        };

        let endpoints = self.endpoints.endpoints().await?;
        info!("Found {} agents for load test", endpoints.len());

        let dispatcher = FanOutDispatcher::from_config(self.client.clone(), &config.load);
        let agents = dispatcher.dispatch(&endpoints, &job).await;
        let summary = MetricsAggregator::merge_all(&agents);
        self.reports.publish(summary.clone());

        info!("---Finished test task");
        Ok(TestResult {
            tenant: tenant.to_string(),
            agents,
            summary,
        })
    }

    /// Delete the tenant and forget its job
    pub async fn teardown(&self, tenant: &str, config: &VaultloadConfig) -> RestResult<()> {
        info!("---Starting teardown task");
        TenantClient::with_client(self.client.clone(), &config.provision)
            .delete_tenant(tenant)
            .await?;
        self.jobs.remove(tenant).await;
        info!("---Finished teardown task");
        Ok(())
    }
}
