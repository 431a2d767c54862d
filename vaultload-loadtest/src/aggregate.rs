//! Incremental merge of per-worker summaries
//!
//! Latency fields are folded with a running weight: each incoming summary
//! contributes in proportion to its share of the cumulative request count at
//! the moment it is merged. Percentiles averaged this way are only an
//! approximation of the true fleet-wide percentiles, and `max` is scaled by
//! the same share, so it depends on merge order and can understate the real
//! maximum. Dashboards built on this output expect exactly these numbers.
//!
//! Errors keep the same shape too: each worker with errors appends `", "`
//! and its comma-joined list, so a non-empty string always starts with
//! `", "`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metrics::MetricsSummary;

/// Composite summary across workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    /// Sum of total latency, milliseconds
    pub total: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
    pub requests: u64,
    /// Duration of the first worker that reported one, seconds
    pub duration: f64,
    /// Sum of worker rates
    pub rate: f64,
    /// True only if every merged worker had a success ratio of exactly 1.0
    pub success: bool,
    pub status_codes: BTreeMap<String, u64>,
    pub errors: String,
}

impl Default for AggregateSummary {
    fn default() -> Self {
        Self {
            total: 0.0,
            mean: 0.0,
            p50: 0.0,
            p95: 0.0,
            p99: 0.0,
            max: 0.0,
            requests: 0,
            duration: 0.0,
            rate: 0.0,
            success: true,
            status_codes: BTreeMap::new(),
            errors: String::new(),
        }
    }
}

/// Folds summaries one at a time in arrival order
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    summary: AggregateSummary,
    merged: usize,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, m: &MetricsSummary) {
        let acc = &mut self.summary;

        acc.requests += m.requests;
        if m.success != 1.0 {
            acc.success = false;
        }
        if acc.duration == 0.0 {
            acc.duration = m.duration;
        }
        acc.total += m.latencies.total;

        let fraction = if acc.requests == 0 {
            0.0
        } else {
            m.requests as f64 / acc.requests as f64
        };
        let rest = 1.0 - fraction;

        acc.mean = fraction * m.latencies.mean + rest * acc.mean;
        acc.p50 = fraction * m.latencies.p50 + rest * acc.p50;
        acc.p95 = fraction * m.latencies.p95 + rest * acc.p95;
        acc.p99 = fraction * m.latencies.p99 + rest * acc.p99;
        acc.max = (fraction * m.latencies.max).max(acc.max);

        acc.rate += m.rate;

        // every worker's errors are prefixed with ", ", including the first
        if !m.errors.is_empty() {
            acc.errors.push_str(", ");
            acc.errors.push_str(&m.errors.join(","));
        }

        for (code, count) in &m.status_codes {
            *acc.status_codes.entry(code.clone()).or_insert(0) += count;
        }

        self.merged += 1;
    }

    /// Number of summaries merged so far
    pub fn merged(&self) -> usize {
        self.merged
    }

    /// Current state; `success` is false until something has been merged
    pub fn snapshot(&self) -> AggregateSummary {
        let mut summary = self.summary.clone();
        if self.merged == 0 {
            summary.success = false;
        }
        summary
    }

    pub fn finish(self) -> AggregateSummary {
        self.snapshot()
    }

    pub fn merge_all<'a, I>(summaries: I) -> AggregateSummary
    where
        I: IntoIterator<Item = &'a MetricsSummary>,
    {
        let mut aggregator = Self::new();
        for summary in summaries {
            aggregator.merge(summary);
        }
        aggregator.finish()
    }
}
