//! Distributed load testing for vaultload
//!
//! A coordinator splits a target request rate across worker agents
//! ([`FanOutDispatcher`]), each agent drives its share with an [`Attacker`]
//! fed by a randomized, never-ending [`TargetGenerator`], and the per-agent
//! [`MetricsSummary`] results are folded into one [`AggregateSummary`].

pub mod aggregate;
pub mod attack;
pub mod client;
pub mod dispatch;
pub mod errors;
pub mod metrics;
pub mod poller;
pub mod report;
pub mod targets;
pub mod types;

// Re-export main types for convenience
pub use aggregate::{AggregateSummary, MetricsAggregator};
pub use attack::{AttackPlan, Attacker, HttpAttacker};
pub use client::build_client;
pub use dispatch::{
    per_endpoint_rate, EndpointSource, FanOutDispatcher, LoadJobSpec, StaticEndpoints,
    WorkerEndpoint,
};
pub use errors::LoadTestError;
pub use metrics::{LatencyMetrics, MetricsRecorder, MetricsSummary};
pub use poller::MetricsPoller;
pub use report::{Column, ColumnType, ReportRow, ReportTable};
pub use targets::{secrets_base_url, Target, TargetGenerator, Targeter};
pub use types::HttpMethod;
