//! Per-worker load test statistics

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::errors::LoadTestError;

/// Latency statistics in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyMetrics {
    pub total: f64,
    pub mean: f64,
    #[serde(rename = "50th")]
    pub p50: f64,
    #[serde(rename = "95th")]
    pub p95: f64,
    #[serde(rename = "99th")]
    pub p99: f64,
    pub max: f64,
}

/// Summary of one worker's attack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSummary {
    pub latencies: LatencyMetrics,
    /// Attack duration in seconds
    pub duration: f64,
    pub requests: u64,
    /// Achieved requests per second
    pub rate: f64,
    /// Ratio of successful requests, 0.0 to 1.0
    pub success: f64,
    pub status_codes: BTreeMap<String, u64>,
    pub errors: Vec<String>,
}

/// Highest trackable latency, one hour in microseconds
const MAX_LATENCY_MICROS: u64 = 3_600_000_000;

/// Accumulates request outcomes into a [`MetricsSummary`]
pub struct MetricsRecorder {
    histogram: Histogram<u64>,
    total_micros: u128,
    requests: u64,
    successes: u64,
    status_codes: BTreeMap<String, u64>,
    errors: BTreeSet<String>,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, LoadTestError> {
        let histogram = Histogram::<u64>::new_with_bounds(1, MAX_LATENCY_MICROS, 3)
            .map_err(|e| LoadTestError::Metrics(e.to_string()))?;
        Ok(Self {
            histogram,
            total_micros: 0,
            requests: 0,
            successes: 0,
            status_codes: BTreeMap::new(),
            errors: BTreeSet::new(),
        })
    }

    /// Record one request.
    ///
    /// `status` is `None` when no response arrived; it is counted as code "0".
    /// Success means a 2xx or 3xx status and no error.
    pub fn record(&mut self, latency: Duration, status: Option<u16>, error: Option<String>) {
        let micros = latency.as_micros();
        self.histogram
            .saturating_record(u64::try_from(micros).unwrap_or(u64::MAX).max(1));
        self.total_micros += micros;
        self.requests += 1;

        let code = status.unwrap_or(0);
        *self.status_codes.entry(code.to_string()).or_insert(0) += 1;

        match error {
            Some(error) => {
                self.errors.insert(error);
            }
            None if (200..400).contains(&code) => self.successes += 1,
            None => {}
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Summarize everything recorded over `elapsed`
    pub fn summary(&self, elapsed: Duration) -> MetricsSummary {
        let ms = |micros: u64| micros as f64 / 1000.0;
        let secs = elapsed.as_secs_f64();

        let latencies = if self.requests == 0 {
            LatencyMetrics::default()
        } else {
            LatencyMetrics {
                total: self.total_micros as f64 / 1000.0,
                mean: self.total_micros as f64 / 1000.0 / self.requests as f64,
                p50: ms(self.histogram.value_at_quantile(0.50)),
                p95: ms(self.histogram.value_at_quantile(0.95)),
                p99: ms(self.histogram.value_at_quantile(0.99)),
                max: ms(self.histogram.max()),
            }
        };

        MetricsSummary {
            latencies,
            duration: secs,
            requests: self.requests,
            rate: if secs > 0.0 {
                self.requests as f64 / secs
            } else {
                0.0
            },
            success: if self.requests == 0 {
                0.0
            } else {
                self.successes as f64 / self.requests as f64
            },
            status_codes: self.status_codes.clone(),
            errors: self.errors.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_summary() {
        let mut recorder = MetricsRecorder::new().unwrap();
        recorder.record(Duration::from_millis(10), Some(200), None);
        recorder.record(Duration::from_millis(30), Some(200), None);
        recorder.record(Duration::from_millis(20), Some(404), Some("404 Not Found".into()));
        recorder.record(Duration::from_millis(5), None, Some("connection refused".into()));

        let summary = recorder.summary(Duration::from_secs(2));
        assert_eq!(summary.requests, 4);
        assert_eq!(summary.success, 0.5);
        assert_eq!(summary.rate, 2.0);
        assert_eq!(summary.status_codes.get("200"), Some(&2));
        assert_eq!(summary.status_codes.get("0"), Some(&1));
        assert_eq!(summary.errors, vec!["404 Not Found", "connection refused"]);
        assert!((summary.latencies.total - 65.0).abs() < 0.01);
        assert!((summary.latencies.mean - 16.25).abs() < 0.01);
        assert!((summary.latencies.max - 30.0).abs() < 0.1);
    }

    #[test]
    fn test_empty_summary() {
        let recorder = MetricsRecorder::new().unwrap();
        let summary = recorder.summary(Duration::ZERO);
        assert_eq!(summary.requests, 0);
        assert_eq!(summary.success, 0.0);
        assert_eq!(summary.rate, 0.0);
    }

    #[test]
    fn test_summary_json_shape() {
        let json = r#"{
            "latencies": {"total": 300.0, "mean": 30.0, "50th": 25.0, "95th": 60.0, "99th": 70.0, "max": 80.0},
            "duration": 10.0,
            "requests": 10,
            "rate": 1.0,
            "success": 1.0,
            "status_codes": {"200": 10},
            "errors": []
        }"#;
        let summary: MetricsSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.latencies.p95, 60.0);
        assert_eq!(summary.status_codes["200"], 10);
    }
}
