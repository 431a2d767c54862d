//! Staged execution of command sets over a bounded worker pool
//!
//! Stages run strictly in order. Within a stage every command is pushed onto
//! one shared bounded queue that `W` worker tasks pull from. Each stage owns a
//! countdown latch and a cancellation token: the latch fires when the last
//! command succeeds, the token fires on the first failure. A failure stops the
//! feeder from queueing the rest of the stage, but commands already queued or
//! running are left to finish on their own.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collector::ResultCollector;
use crate::command::{CmdResult, Command, CommandKind, CommandSet, Stage};
use crate::error::{CommandError, ProvisionError};
use crate::runner::CommandRunner;

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    StageRunning(usize),
    StageDone(usize),
    Failed(usize),
    Terminal,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub tokens: Vec<String>,
    pub completed_stages: usize,
}

/// Executes command sets with at most `workers` commands in flight
pub struct Pipeline {
    runner: Arc<dyn CommandRunner>,
    workers: usize,
    state: watch::Sender<PipelineState>,
}

struct Job {
    command: Command,
    tracker: Arc<StageTracker>,
}

/// Countdown latch plus first-error slot for one stage
struct StageTracker {
    stage: usize,
    remaining: AtomicUsize,
    done: Notify,
    cancel: CancellationToken,
    error: std::sync::Mutex<Option<CommandError>>,
}

impl StageTracker {
    fn new(stage: usize, size: usize) -> Self {
        Self {
            stage,
            remaining: AtomicUsize::new(size),
            done: Notify::new(),
            cancel: CancellationToken::new(),
            error: std::sync::Mutex::new(None),
        }
    }

    fn complete_one(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.done.notify_one();
        }
    }

    fn fail(&self, error: CommandError) {
        if let Ok(mut slot) = self.error.lock() {
            if slot.is_none() {
                *slot = Some(error);
            }
        }
        self.cancel.cancel();
    }

    fn take_error(&self) -> CommandError {
        self.error
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or(CommandError::Aborted)
    }
}

impl Pipeline {
    pub fn new(runner: Arc<dyn CommandRunner>, workers: usize) -> Result<Self, ProvisionError> {
        if workers == 0 {
            return Err(ProvisionError::InvalidConfig(
                "worker pool size must be at least 1".to_string(),
            ));
        }
        let (state, _) = watch::channel(PipelineState::Idle);
        Ok(Self {
            runner,
            workers,
            state,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Observe state transitions of this pipeline
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    fn transition(&self, state: PipelineState) {
        debug!("Pipeline state: {:?}", state);
        self.state.send_replace(state);
    }

    /// Run every stage in order and return the collected tokens
    pub async fn run(&self, commands: CommandSet) -> Result<PipelineReport, ProvisionError> {
        let expected_tokens = commands
            .iter()
            .flatten()
            .filter(|command| command.kind() == CommandKind::Token)
            .count();
        let stage_count = commands.len();

        self.transition(PipelineState::Idle);
        info!(
            "Starting pipeline: {} stages, {} workers, {} expected tokens",
            stage_count, self.workers, expected_tokens
        );

        let (queue_tx, queue_rx) = mpsc::channel::<Job>(self.workers);
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let (results_tx, collector) = ResultCollector::channel(expected_tokens);

        let workers: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    queue_rx.clone(),
                    self.runner.clone(),
                    results_tx.clone(),
                ))
            })
            .collect();
        drop(results_tx);

        let mut completed_stages = 0;
        for (index, stage) in commands.into_iter().enumerate() {
            self.transition(PipelineState::StageRunning(index));
            info!("Stage {}/{}: {} commands", index, stage_count, stage.len());

            if let Err(source) = run_stage(index, stage, &queue_tx).await {
                self.transition(PipelineState::Failed(index));
                warn!("Operation cancelled at stage {} due to error: {}", index, source);
                collector.abandon();
                return Err(ProvisionError::StageFailed {
                    stage: index,
                    completed_stages,
                    source,
                });
            }

            completed_stages += 1;
            self.transition(PipelineState::StageDone(index));
            info!("Finished stage {}", index);
        }

        // Closing the queue lets idle workers exit
        drop(queue_tx);
        for handle in workers {
            if let Err(e) = handle.await {
                warn!("Provisioning worker stopped abnormally: {}", e);
            }
        }

        let tokens = collector.finish().await;
        self.transition(PipelineState::Terminal);
        info!(
            "Pipeline finished: {} stages, {} tokens",
            completed_stages,
            tokens.len()
        );

        Ok(PipelineReport {
            tokens,
            completed_stages,
        })
    }
}

async fn run_stage(
    index: usize,
    stage: Stage,
    queue: &mpsc::Sender<Job>,
) -> Result<(), CommandError> {
    if stage.is_empty() {
        return Ok(());
    }

    let tracker = Arc::new(StageTracker::new(index, stage.len()));

    let feeder = {
        let queue = queue.clone();
        let tracker = tracker.clone();
        tokio::spawn(async move {
            for command in stage {
                let job = Job {
                    command,
                    tracker: tracker.clone(),
                };
                tokio::select! {
                    biased;
                    _ = tracker.cancel.cancelled() => break,
                    sent = queue.send(job) => {
                        if sent.is_err() {
                            tracker.fail(CommandError::QueueClosed);
                            break;
                        }
                    }
                }
            }
        })
    };

    let outcome = tokio::select! {
        biased;
        _ = tracker.cancel.cancelled() => Err(tracker.take_error()),
        _ = tracker.done.notified() => Ok(()),
    };

    if let Err(e) = feeder.await {
        warn!("Stage {} feeder stopped abnormally: {}", index, e);
    }

    outcome
}

async fn worker_loop(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Job>>>,
    runner: Arc<dyn CommandRunner>,
    results: mpsc::UnboundedSender<CmdResult>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };

        if job.command.args().is_empty() {
            job.tracker.complete_one();
            continue;
        }

        // A runner that panics must still settle the stage
        let kind = job.command.kind();
        let rendered = job.command.to_string();
        let run = {
            let runner = runner.clone();
            let command = job.command;
            tokio::spawn(async move { runner.run(&command).await })
        };
        let outcome = run.await.unwrap_or_else(|e| {
            Err(CommandError::Panicked {
                command: rendered,
                message: e.to_string(),
            })
        });

        match outcome {
            Ok(output) => {
                if kind == CommandKind::Token {
                    match CmdResult::token_from_output(&output) {
                        // The collector may already have everything it expects
                        Some(result) => {
                            let _ = results.send(result);
                        }
                        None => warn!(
                            "Token command in stage {} returned no access token",
                            job.tracker.stage
                        ),
                    }
                }
                job.tracker.complete_one();
            }
            Err(e) => {
                warn!("Command failed in stage {}: {}", job.tracker.stage, e);
                job.tracker.fail(e);
            }
        }
    }
    debug!("Provisioning worker {} exiting", id);
}
