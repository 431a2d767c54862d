//! Paced HTTP attacks

use async_trait::async_trait;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::errors::LoadTestError;
use crate::metrics::{MetricsRecorder, MetricsSummary};
use crate::targets::{Target, Targeter};

/// One attack: `rate` requests per second for `duration`
pub struct AttackPlan {
    pub targeter: Targeter,
    pub rate: u64,
    pub duration: Duration,
    /// Maximum requests in flight
    pub workers: usize,
}

/// Runs a targeted HTTP load test and summarizes it
#[async_trait]
pub trait Attacker: Send + Sync {
    async fn attack(&self, plan: AttackPlan) -> Result<MetricsSummary, LoadTestError>;
}

/// Attacker issuing real HTTP requests with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpAttacker {
    client: Client,
}

impl HttpAttacker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn lock_error<T>(_: T) -> LoadTestError {
    LoadTestError::Metrics("metrics recorder lock poisoned".to_string())
}

#[async_trait]
impl Attacker for HttpAttacker {
    async fn attack(&self, plan: AttackPlan) -> Result<MetricsSummary, LoadTestError> {
        let AttackPlan {
            mut targeter,
            rate,
            duration,
            workers,
        } = plan;

        let recorder = Arc::new(Mutex::new(MetricsRecorder::new()?));
        let hits = (rate as f64 * duration.as_secs_f64()).round() as u64;
        if hits == 0 {
            debug!("Nothing to send at {} rps for {:?}", rate, duration);
            return recorder.lock().map_err(lock_error).map(|r| r.summary(Duration::ZERO));
        }

        info!(
            "Starting attack: {} rps for {}s with {} workers",
            rate,
            duration.as_secs(),
            workers
        );

        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut ticker = interval(Duration::from_secs_f64(1.0 / rate as f64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        let mut in_flight = JoinSet::new();
        let started = Instant::now();

        for _ in 0..hits {
            ticker.tick().await;
            let target = targeter.next_target()?;
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| LoadTestError::Metrics(e.to_string()))?;

            let client = self.client.clone();
            let recorder = recorder.clone();
            in_flight.spawn(async move {
                let (latency, status, error) = hit(&client, target).await;
                drop(permit);
                if let Ok(mut recorder) = recorder.lock() {
                    recorder.record(latency, status, error);
                }
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!("Attack request task failed: {}", e);
            }
        }

        let elapsed = started.elapsed();
        let summary = recorder.lock().map_err(lock_error)?.summary(elapsed);
        info!(
            "Completed attack: {} requests, success ratio {:.3}",
            summary.requests, summary.success
        );
        Ok(summary)
    }
}

async fn hit(client: &Client, target: Target) -> (Duration, Option<u16>, Option<String>) {
    let started = Instant::now();

    let mut request = client.request(target.method.into(), &target.url);
    for (name, values) in &target.header {
        for value in values {
            request = request.header(name.as_str(), value.as_str());
        }
    }

    match request.send().await {
        Ok(response) => {
            let status = response.status();
            // drain the body so the latency covers the full response
            let body = response.bytes().await;
            let latency = started.elapsed();

            let error = match body {
                Err(e) => Some(e.to_string()),
                Ok(_) if status.is_success() || status.is_redirection() => None,
                Ok(_) => Some(status.to_string()),
            };
            (latency, Some(status.as_u16()), error)
        }
        Err(e) => (started.elapsed(), None, Some(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_attack_against_mock_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/secrets/scope/.+$"))
            .and(header("authorization", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let root = format!("{}/secrets", server.uri());
        let targeter = Targeter::dynamic(
            &root,
            vec!["scope/a".to_string(), "scope/b".to_string()],
            vec!["tok-1".to_string()],
        )
        .unwrap();

        let attacker = HttpAttacker::new(Client::new());
        let summary = attacker
            .attack(AttackPlan {
                targeter,
                rate: 50,
                duration: Duration::from_millis(200),
                workers: 4,
            })
            .await
            .unwrap();

        assert_eq!(summary.requests, 10);
        assert_eq!(summary.success, 1.0);
        assert_eq!(summary.status_codes.get("200"), Some(&10));
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_failed_requests_are_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let targeter = Targeter::static_paths(&server.uri(), vec!["x".to_string()]).unwrap();
        let summary = HttpAttacker::new(Client::new())
            .attack(AttackPlan {
                targeter,
                rate: 20,
                duration: Duration::from_millis(100),
                workers: 1,
            })
            .await
            .unwrap();

        assert_eq!(summary.requests, 2);
        assert_eq!(summary.success, 0.0);
        assert_eq!(summary.errors, vec!["403 Forbidden"]);
    }

    #[tokio::test]
    async fn test_zero_rate_sends_nothing() {
        let targeter = Targeter::static_paths("http://127.0.0.1:9", vec!["x".to_string()]).unwrap();
        let summary = HttpAttacker::new(Client::new())
            .attack(AttackPlan {
                targeter,
                rate: 0,
                duration: Duration::from_secs(5),
                workers: 1,
            })
            .await
            .unwrap();
        assert_eq!(summary.requests, 0);
    }
}
