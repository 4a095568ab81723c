//! Execution dispatcher.
//!
//! Chooses, once per run, whether aggregation happens on the
//! [`BackgroundWorker`] or inline on the caller's task, and delivers the
//! run's [`RunMessage`]s to the consumer either way. Both paths drive the
//! same [`AnalysisRun`], so their results are identical for identical input.

use std::fmt;
use std::str::FromStr;

use insight_core::dates::DateNormalizer;
use insight_core::error::{InsightError, Result};
use insight_core::models::AggregationResult;
use insight_data::analysis::AnalysisRun;
use insight_data::reader::SourceFormat;
use tracing::{debug, info, warn};

use crate::messages::RunMessage;
use crate::worker::BackgroundWorker;

// ── Strategy types ────────────────────────────────────────────────────────────

/// Which execution paths the caller allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyPreference {
    /// Background when the worker is available, foreground otherwise.
    #[default]
    Auto,
    Background,
    Foreground,
}

impl FromStr for StrategyPreference {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(StrategyPreference::Auto),
            "background" => Ok(StrategyPreference::Background),
            "foreground" => Ok(StrategyPreference::Foreground),
            other => Err(InsightError::Config(format!("unknown strategy \"{}\"", other))),
        }
    }
}

/// The path a run actually took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Isolated worker thread, buffer moved in, messages over a channel.
    Background,
    /// Inline on the caller's task, yielding between chunks.
    Foreground,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStrategy::Background => f.write_str("background"),
            ExecutionStrategy::Foreground => f.write_str("foreground"),
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub struct RunOutcome {
    pub strategy: ExecutionStrategy,
    /// Non-fatal note, e.g. that the worker was unavailable and the run
    /// fell back to the foreground.
    pub advisory: Option<String>,
    pub result: Result<AggregationResult>,
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Runs aggregation jobs on the preferred execution path.
pub struct Dispatcher {
    worker: Option<BackgroundWorker>,
    normalizer: DateNormalizer,
    advisory: Option<String>,
}

impl Dispatcher {
    /// Create a dispatcher, starting the background worker unless the
    /// preference is [`StrategyPreference::Foreground`].
    pub fn new(preference: StrategyPreference, normalizer: DateNormalizer) -> Self {
        if preference == StrategyPreference::Foreground {
            return Self::with_worker(None, normalizer);
        }
        match BackgroundWorker::spawn() {
            Ok(worker) => Self::with_worker(Some(worker), normalizer),
            Err(e) => {
                warn!(error = %e, "background worker unavailable; runs will use the foreground");
                let mut dispatcher = Self::with_worker(None, normalizer);
                dispatcher.advisory = Some(format!("{}; running in the foreground", e));
                dispatcher
            }
        }
    }

    /// Create a dispatcher around an existing worker (or none).
    pub fn with_worker(worker: Option<BackgroundWorker>, normalizer: DateNormalizer) -> Self {
        Self {
            worker,
            normalizer,
            advisory: None,
        }
    }

    /// The path the next run will try first.
    ///
    /// A worker counts as available until a handoff to it fails.
    pub fn strategy(&self) -> ExecutionStrategy {
        match &self.worker {
            Some(_) => ExecutionStrategy::Background,
            None => ExecutionStrategy::Foreground,
        }
    }

    /// Run one aggregation over `buffer`, calling `on_message` for every
    /// message in order.
    ///
    /// A failed handoff, or a worker whose thread has exited, drops the
    /// worker and runs the buffer in the foreground; the fallback is reported
    /// through [`RunOutcome::advisory`].
    pub async fn run(
        &mut self,
        buffer: Vec<u8>,
        format: SourceFormat,
        mut on_message: impl FnMut(&RunMessage),
    ) -> RunOutcome {
        let mut advisory = self.advisory.take();

        let buffer = match self.strategy() {
            ExecutionStrategy::Background => match self.submit(buffer, format) {
                Ok(rx) => {
                    info!(strategy = %ExecutionStrategy::Background, "run started");
                    return RunOutcome {
                        strategy: ExecutionStrategy::Background,
                        advisory,
                        result: receive(rx, &mut on_message).await,
                    };
                }
                Err(buffer) => {
                    self.worker = None;
                    advisory = Some("background handoff failed; running in the foreground".to_string());
                    buffer
                }
            },
            ExecutionStrategy::Foreground => buffer,
        };

        info!(strategy = %ExecutionStrategy::Foreground, "run started");
        RunOutcome {
            strategy: ExecutionStrategy::Foreground,
            advisory,
            result: run_foreground(buffer, format, self.normalizer.clone(), &mut on_message).await,
        }
    }

    fn submit(
        &self,
        buffer: Vec<u8>,
        format: SourceFormat,
    ) -> std::result::Result<tokio::sync::mpsc::Receiver<RunMessage>, Vec<u8>> {
        match &self.worker {
            Some(worker) if worker.is_available() => {
                worker.submit(buffer, format, self.normalizer.clone())
            }
            _ => Err(buffer),
        }
    }
}

// ── Execution paths ───────────────────────────────────────────────────────────

/// Forward worker messages until the terminal one arrives.
async fn receive(
    mut rx: tokio::sync::mpsc::Receiver<RunMessage>,
    on_message: &mut impl FnMut(&RunMessage),
) -> Result<AggregationResult> {
    while let Some(msg) = rx.recv().await {
        on_message(&msg);
        match msg {
            RunMessage::Progress { percent } => debug!(percent, "background progress"),
            RunMessage::Result(result) => return Ok(result),
            RunMessage::Error { message } => return Err(InsightError::WorkerFault(message)),
        }
    }
    let message = "worker exited without a result".to_string();
    on_message(&RunMessage::Error {
        message: message.clone(),
    });
    Err(InsightError::WorkerFault(message))
}

/// Decode and aggregate on the current task, yielding after every chunk.
pub async fn run_foreground(
    buffer: Vec<u8>,
    format: SourceFormat,
    normalizer: DateNormalizer,
    on_message: &mut impl FnMut(&RunMessage),
) -> Result<AggregationResult> {
    let table = match format.decode(&buffer) {
        Ok(table) => table,
        Err(e) => {
            on_message(&RunMessage::Error {
                message: e.to_string(),
            });
            return Err(e);
        }
    };
    drop(buffer);

    let mut run = AnalysisRun::new(table, normalizer);
    while let Some(percent) = run.step() {
        on_message(&RunMessage::Progress { percent });
        tokio::task::yield_now().await;
    }

    let result = run.finish();
    on_message(&RunMessage::Result(result.clone()));
    Ok(result)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
