//! Background worker: an isolated thread that runs aggregation jobs.
//!
//! The worker shares no state with its caller. A job moves the input buffer
//! into the worker; progress and the terminal message come back over an
//! ordered `mpsc` channel. Dropping the receiving end does not stop a job,
//! it simply runs to completion with nobody listening.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};

use insight_core::dates::DateNormalizer;
use insight_core::error::{InsightError, Result};
use insight_data::analysis::AnalysisRun;
use insight_data::reader::SourceFormat;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::messages::RunMessage;

/// Capacity of the per-run message channel.
const MESSAGE_BUFFER: usize = 32;

/// One unit of work handed to the worker thread.
struct Job {
    buffer: Vec<u8>,
    format: SourceFormat,
    normalizer: DateNormalizer,
    reply: mpsc::Sender<RunMessage>,
}

// ── BackgroundWorker ──────────────────────────────────────────────────────────

/// Handle to a dedicated aggregation thread.
///
/// Jobs are processed one at a time in submission order. Dropping the
/// handle closes the job queue; the thread exits after its current job.
pub struct BackgroundWorker {
    jobs: std_mpsc::Sender<Job>,
    thread: Option<JoinHandle<()>>,
}

impl BackgroundWorker {
    /// Start the worker thread.
    pub fn spawn() -> Result<Self> {
        let (jobs, queue) = std_mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name("insight-worker".to_string())
            .spawn(move || {
                for job in queue {
                    process_job(job);
                }
                debug!("job queue closed; worker exiting");
            })
            .map_err(|e| InsightError::WorkerUnavailable(e.to_string()))?;

        debug!("background worker started");
        Ok(Self {
            jobs,
            thread: Some(thread),
        })
    }

    /// `true` while the worker thread is alive.
    pub fn is_available(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Hand `buffer` to the worker and return the run's message stream.
    ///
    /// On handoff failure the buffer comes back untouched in `Err`.
    pub fn submit(
        &self,
        buffer: Vec<u8>,
        format: SourceFormat,
        normalizer: DateNormalizer,
    ) -> std::result::Result<mpsc::Receiver<RunMessage>, Vec<u8>> {
        let (reply, rx) = mpsc::channel(MESSAGE_BUFFER);
        let job = Job {
            buffer,
            format,
            normalizer,
            reply,
        };
        match self.jobs.send(job) {
            Ok(()) => Ok(rx),
            Err(std_mpsc::SendError(job)) => {
                warn!("background worker is gone; handoff failed");
                Err(job.buffer)
            }
        }
    }

    /// Close the job queue and wait for the thread to finish.
    pub fn shutdown(mut self) {
        let thread = self.thread.take();
        drop(self);
        if let Some(thread) = thread {
            if thread.join().is_err() {
                warn!("background worker thread panicked");
            }
        }
    }

    /// A worker whose thread has already gone away.
    #[cfg(test)]
    pub(crate) fn disconnected() -> Self {
        let (jobs, _) = std_mpsc::channel::<Job>();
        Self { jobs, thread: None }
    }

    /// A worker whose thread has finished while its queue still accepts jobs.
    #[cfg(test)]
    pub(crate) fn exited() -> Self {
        let (jobs, queue) = std_mpsc::channel::<Job>();
        std::mem::forget(queue);
        let thread = thread::spawn(|| {});
        while !thread.is_finished() {
            thread::yield_now();
        }
        Self {
            jobs,
            thread: Some(thread),
        }
    }
}

// ── Job processing ────────────────────────────────────────────────────────────

/// Run one job, turning decode failures and panics into an error message.
fn process_job(job: Job) {
    let Job {
        buffer,
        format,
        normalizer,
        reply,
    } = job;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_job(buffer, format, normalizer, &reply)));

    let terminal = match outcome {
        Ok(Ok(result)) => RunMessage::Result(result),
        Ok(Err(e)) => RunMessage::Error {
            message: e.to_string(),
        },
        Err(payload) => RunMessage::Error {
            message: format!("worker panicked: {}", panic_message(payload.as_ref())),
        },
    };

    if reply.blocking_send(terminal).is_err() {
        debug!("run consumer went away before the result was delivered");
    }
}

fn run_job(
    buffer: Vec<u8>,
    format: SourceFormat,
    normalizer: DateNormalizer,
    reply: &mpsc::Sender<RunMessage>,
) -> Result<insight_core::models::AggregationResult> {
    let table = format.decode(&buffer)?;
    drop(buffer);

    let mut run = AnalysisRun::new(table, normalizer);
    let mut listening = true;
    while let Some(percent) = run.step() {
        if listening && reply.blocking_send(RunMessage::Progress { percent }).is_err() {
            debug!("run consumer went away; finishing without progress");
            listening = false;
        }
    }
    Ok(run.finish())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "InvoiceDate,CustomerID,Country\n\
        12/1/2010 8:26,17850,United Kingdom\n\
        12/1/2010 8:28,17850,United Kingdom\n\
        12/2/2010 9:01,12583,France\n";

    fn csv_format() -> SourceFormat {
        SourceFormat::Delimited { delimiter: b',' }
    }

    async fn drain(mut rx: mpsc::Receiver<RunMessage>) -> Vec<RunMessage> {
        let mut out = Vec::new();
        while let Some(msg) = rx.recv().await {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_worker_runs_job_to_result() {
        let worker = BackgroundWorker::spawn().expect("spawn");
        assert!(worker.is_available());

        let rx = worker
            .submit(CSV.as_bytes().to_vec(), csv_format(), DateNormalizer::default())
            .expect("handoff");
        let messages = drain(rx).await;

        assert_eq!(
            &messages[..3],
            &[
                RunMessage::Progress { percent: 33 },
                RunMessage::Progress { percent: 67 },
                RunMessage::Progress { percent: 100 },
            ]
        );
        match messages.last() {
            Some(RunMessage::Result(result)) => {
                assert_eq!(result.country_customer_counts().get("United Kingdom"), Some(&1));
                assert_eq!(result.date_counts.get("2010-12-01"), Some(&2));
            }
            other => panic!("expected result, got {other:?}"),
        }
        worker.shutdown();
    }

    #[tokio::test]
    async fn test_decode_failure_is_single_error_message() {
        let worker = BackgroundWorker::spawn().expect("spawn");
        let rx = worker
            .submit(b"not a workbook".to_vec(), SourceFormat::Workbook, DateNormalizer::default())
            .expect("handoff");
        let messages = drain(rx).await;

        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0], RunMessage::Error { message } if message.contains("decode")));
        worker.shutdown();
    }

    #[tokio::test]
    async fn test_worker_processes_jobs_in_order() {
        let worker = BackgroundWorker::spawn().expect("spawn");
        let first = worker
            .submit(CSV.as_bytes().to_vec(), csv_format(), DateNormalizer::default())
            .expect("handoff");
        let second = worker
            .submit(b"Country\n".to_vec(), csv_format(), DateNormalizer::default())
            .expect("handoff");

        assert!(drain(first).await.last().is_some_and(RunMessage::is_terminal));
        let second = drain(second).await;
        assert_eq!(second[0], RunMessage::Progress { percent: 100 });
        assert!(matches!(&second[1], RunMessage::Result(r) if r.is_empty()));
        worker.shutdown();
    }

    #[test]
    fn test_disconnected_worker_returns_buffer() {
        let worker = BackgroundWorker::disconnected();
        assert!(!worker.is_available());
        assert!(!BackgroundWorker::exited().is_available());
        let buffer = worker
            .submit(vec![1, 2, 3], csv_format(), DateNormalizer::default())
            .unwrap_err();
        assert_eq!(buffer, vec![1, 2, 3]);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("exploded");
        assert_eq!(panic_message(payload.as_ref()), "exploded");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
    }
}
