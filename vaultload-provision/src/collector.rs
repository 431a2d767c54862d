//! Harvesting of typed command results

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::{CmdResult, CommandKind};

/// Background task accumulating token results.
///
/// Producers send over an unbounded channel so a slow collector never stalls
/// the worker pool. Collection ends once `expected` tokens have arrived or
/// every sender is gone.
pub struct ResultCollector {
    handle: JoinHandle<Vec<String>>,
}

impl ResultCollector {
    /// Create the hand-off channel and spawn the collector on it
    pub fn channel(expected: usize) -> (mpsc::UnboundedSender<CmdResult>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::spawn(rx, expected))
    }

    pub fn spawn(mut results: mpsc::UnboundedReceiver<CmdResult>, expected: usize) -> Self {
        let handle = tokio::spawn(async move {
            let mut tokens = Vec::with_capacity(expected);
            while tokens.len() < expected {
                match results.recv().await {
                    Some(CmdResult {
                        kind: CommandKind::Token,
                        value,
                    }) => tokens.push(value),
                    Some(other) => {
                        warn!(
                            "Unhandled result of kind {}, value: {}",
                            other.kind, other.value
                        );
                    }
                    None => {
                        debug!(
                            "Result channel closed after {} of {} tokens",
                            tokens.len(),
                            expected
                        );
                        break;
                    }
                }
            }
            tokens
        });

        Self { handle }
    }

    /// Wait for collection to finish and return the tokens
    pub async fn finish(self) -> Vec<String> {
        match self.handle.await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Result collector stopped abnormally: {}", e);
                Vec::new()
            }
        }
    }

    /// Stop collecting and discard whatever was gathered
    pub fn abandon(self) {
        self.handle.abort();
    }
}
