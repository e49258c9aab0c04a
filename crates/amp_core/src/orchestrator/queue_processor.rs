//! Queue controller that runs queued jobs on a background worker.
//!
//! Jobs run strictly one at a time, front to back. The caller talks to the
//! worker through `QueueController` and receives `QueueEvent`s on an
//! unbounded channel, so the worker never waits on the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;

use crate::config::Settings;
use crate::jobs::{validate_params, JobId, JobQueue, QueuedJob, ValidationError};
use crate::logging::{JobLogger, LogCallback, LogConfig};
use crate::models::{JobParams, ProgressEvent};
use crate::tools::Toolset;

use super::cancel::CancelToken;
use super::create_standard_pipeline;
use super::types::{Context, RunState};

/// Name of the worker thread.
pub const WORKER_THREAD_NAME: &str = "amp-queue";

/// Errors from queue control operations.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("A queue run is already in progress")]
    AlreadyRunning,

    #[error("The queue is busy; stop processing before clearing it")]
    Busy,

    #[error("Failed to start queue worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// How a single job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Pipeline finished; files written to the output directory.
    Succeeded { outputs: Vec<PathBuf> },
    /// Pipeline failed; the queue stops and keeps remaining jobs.
    Failed {
        message: String,
        detail: Option<String>,
    },
    /// Cancellation observed; the queue stops and drops remaining jobs.
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Result of one queue run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueueSummary {
    /// Jobs that finished successfully.
    pub completed: usize,
    /// Jobs still queued when the run ended.
    pub remaining: usize,
    /// Job that stopped the queue with an error.
    pub failed_job: Option<JobId>,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl QueueSummary {
    /// Every job ran and none failed.
    pub fn is_success(&self) -> bool {
        self.failed_job.is_none() && !self.cancelled
    }
}

/// Events delivered to the caller in emission order.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    JobStarted {
        job_id: JobId,
        /// 1-based position of this job in the current run.
        position: usize,
        total: usize,
        /// Completed jobs / total, as a percentage.
        queue_percent: f64,
    },
    Progress {
        job_id: JobId,
        event: ProgressEvent,
    },
    Log {
        job_id: JobId,
        line: String,
    },
    JobFinished {
        job_id: JobId,
        outcome: JobOutcome,
    },
    QueueFinished(QueueSummary),
}

/// State shared between the controller and its worker thread.
struct Shared {
    queue: Mutex<JobQueue>,
    settings: Settings,
    tools: Toolset,
    cancel: CancelToken,
    running: AtomicBool,
    events: Sender<QueueEvent>,
}

impl Shared {
    fn emit(&self, event: QueueEvent) {
        let _ = self.events.send(event);
    }

    /// Run until the queue is empty, a job fails, or cancellation.
    fn process_queue(&self) -> QueueSummary {
        let mut summary = QueueSummary::default();

        loop {
            if self.cancel.is_cancelled() {
                let dropped = self.queue.lock().clear();
                tracing::info!("Queue cancelled; dropped {} pending job(s)", dropped);
                summary.cancelled = true;
                break;
            }

            let (job, remaining) = {
                let queue = self.queue.lock();
                (queue.front(), queue.len())
            };
            let Some(job) = job else {
                break;
            };

            let total = summary.completed + remaining;
            self.emit(QueueEvent::JobStarted {
                job_id: job.id.clone(),
                position: summary.completed + 1,
                total,
                queue_percent: summary.completed as f64 / total as f64 * 100.0,
            });
            tracing::info!(
                "Starting job {}/{}: {}",
                summary.completed + 1,
                total,
                job.label()
            );

            let outcome = self.run_job(&job);
            self.emit(QueueEvent::JobFinished {
                job_id: job.id.clone(),
                outcome: outcome.clone(),
            });

            match outcome {
                JobOutcome::Succeeded { .. } => {
                    self.queue.lock().pop_front_if(&job.id);
                    summary.completed += 1;
                }
                JobOutcome::Cancelled => {
                    let dropped = self.queue.lock().clear();
                    tracing::info!("Job {} cancelled; dropped {} job(s)", job.id, dropped);
                    summary.cancelled = true;
                    break;
                }
                JobOutcome::Failed { ref message, .. } => {
                    tracing::warn!("Job {} failed, stopping queue: {}", job.id, message);
                    summary.failed_job = Some(job.id.clone());
                    break;
                }
            }
        }

        summary.remaining = self.queue.lock().len();
        summary
    }

    /// Run one job through the standard pipeline.
    fn run_job(&self, job: &QueuedJob) -> JobOutcome {
        let job_name = format!("job_{}", job.id.short());

        let log_sender = self.events.clone();
        let log_job = job.id.clone();
        let log_callback: LogCallback = Box::new(move |line| {
            let _ = log_sender.send(QueueEvent::Log {
                job_id: log_job.clone(),
                line: line.to_string(),
            });
        });

        let logger = match JobLogger::new(
            &job_name,
            &self.settings.paths.logs_folder,
            LogConfig::from_settings(&self.settings.logging),
            Some(log_callback),
        ) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                return JobOutcome::Failed {
                    message: format!("Failed to create logger: {}", e),
                    detail: None,
                }
            }
        };

        let progress_sender = self.events.clone();
        let progress_job = job.id.clone();
        let ctx = Context::new(
            job.params.clone(),
            self.settings.clone(),
            &job_name,
            self.tools.clone(),
            self.cancel.clone(),
            Arc::clone(&logger),
        )
        .with_progress_callback(Box::new(move |event| {
            let _ = progress_sender.send(QueueEvent::Progress {
                job_id: progress_job.clone(),
                event,
            });
        }));

        logger.info(&format!("Starting job: {}", job.label()));
        logger.info(&format!("Submitted: {}", job.submitted_at));

        let mut state = RunState::new(job.id.as_str());
        let pipeline = create_standard_pipeline();

        let result = panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(&ctx, &mut state)));
        let outcome = match result {
            Ok(Ok(run)) => {
                logger.success(&format!(
                    "Job completed ({} step(s) run, {} skipped)",
                    run.steps_completed.len(),
                    run.steps_skipped.len()
                ));
                JobOutcome::Succeeded {
                    outputs: run.outputs,
                }
            }
            Ok(Err(e)) if e.is_cancelled() => JobOutcome::Cancelled,
            Ok(Err(e)) => JobOutcome::Failed {
                message: e.summary(),
                detail: e.detail().map(str::to_string),
            },
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("Job {} panicked: {}", job.id, message);
                logger.error(&format!("Unexpected internal error: {}", message));
                JobOutcome::Failed {
                    message: format!("Unexpected internal error: {}", message),
                    detail: None,
                }
            }
        };

        logger.flush();
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Caller-facing handle to the job queue.
///
/// # Example
///
/// ```ignore
/// let controller = QueueController::new(settings);
/// controller.submit_job(params)?;
/// controller.start()?;
/// for event in controller.events().iter() {
///     if let QueueEvent::QueueFinished(summary) = event {
///         break;
///     }
/// }
/// ```
pub struct QueueController {
    shared: Arc<Shared>,
    events: Receiver<QueueEvent>,
    worker: Mutex<Option<JoinHandle<QueueSummary>>>,
}

impl QueueController {
    /// Controller using the subprocess tools named in `settings`.
    pub fn new(settings: Settings) -> Self {
        let tools = Toolset::from_settings(&settings.tools);
        Self::with_tools(settings, tools)
    }

    /// Controller with explicit tool implementations.
    pub fn with_tools(settings: Settings, tools: Toolset) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(JobQueue::new()),
                settings,
                tools,
                cancel: CancelToken::new(),
                running: AtomicBool::new(false),
                events: sender,
            }),
            events: receiver,
            worker: Mutex::new(None),
        }
    }

    /// Validate and enqueue a job. Allowed at any time.
    pub fn submit_job(&self, params: JobParams) -> Result<JobId, ValidationError> {
        validate_params(&params, &self.shared.settings.queue.extra_hosts)?;

        let job = QueuedJob::new(params);
        let id = job.id.clone();
        tracing::info!("Queued {}", job.label());
        self.shared.queue.lock().push(job);
        Ok(id)
    }

    /// Remove a job. Returns false while a run is active or if unknown.
    pub fn remove_job(&self, id: &JobId) -> bool {
        if self.is_running() {
            tracing::debug!("Ignoring removal of {} during a queue run", id);
            return false;
        }
        self.shared.queue.lock().remove(id).is_some()
    }

    /// Empty the queue. Refused while running unless a stop was requested.
    pub fn clear(&self) -> Result<usize, QueueError> {
        if self.is_running() && !self.shared.cancel.is_cancelled() {
            return Err(QueueError::Busy);
        }
        Ok(self.shared.queue.lock().clear())
    }

    /// Start processing on the background worker.
    pub fn start(&self) -> Result<(), QueueError> {
        self.acquire_run()?;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(&shared));

        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(QueueError::Spawn(e))
            }
        }
    }

    /// Process the queue on the calling thread.
    pub fn run_blocking(&self) -> Result<QueueSummary, QueueError> {
        self.acquire_run()?;
        Ok(run_worker(&self.shared))
    }

    /// Request cancellation of the current run.
    pub fn cancel(&self) {
        tracing::info!("Cancellation requested");
        self.shared.cancel.cancel();
    }

    /// Block until the background worker finishes.
    ///
    /// Returns `None` if no worker was started or it panicked.
    pub fn wait(&self) -> Option<QueueSummary> {
        let handle = self.worker.lock().take()?;
        handle.join().ok()
    }

    /// Receiver for queue events.
    pub fn events(&self) -> Receiver<QueueEvent> {
        self.events.clone()
    }

    /// Token shared with running jobs (for signal handlers).
    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.lock().is_empty()
    }

    /// Ids of queued jobs in order.
    pub fn job_ids(&self) -> Vec<JobId> {
        self.shared.queue.lock().ids()
    }

    fn acquire_run(&self) -> Result<(), QueueError> {
        self.shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| QueueError::AlreadyRunning)?;
        self.shared.cancel.reset();
        Ok(())
    }
}

/// Worker body: process, release the run flag, then announce completion.
fn run_worker(shared: &Shared) -> QueueSummary {
    let summary = shared.process_queue();
    shared.running.store(false, Ordering::SeqCst);
    tracing::info!(
        "Queue finished: {} completed, {} remaining",
        summary.completed,
        summary.remaining
    );
    shared.emit(QueueEvent::QueueFinished(summary.clone()));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn summary_success() {
        let mut summary = QueueSummary {
            completed: 2,
            ..Default::default()
        };
        assert!(summary.is_success());
        summary.cancelled = true;
        assert!(!summary.is_success());
    }

    #[test]
    fn empty_queue_run_finishes_immediately() {
        let controller = QueueController::new(Settings::default());
        let summary = controller.run_blocking().unwrap();
        assert_eq!(summary, QueueSummary::default());
        assert!(!controller.is_running());

        let events: Vec<QueueEvent> = controller.events().try_iter().collect();
        assert!(matches!(events.as_slice(), [QueueEvent::QueueFinished(_)]));
    }

    #[test]
    fn invalid_jobs_are_rejected() {
        let controller = QueueController::new(Settings::default());
        let params = JobParams::new(
            crate::models::SourceLocator::parse("https://example.com/x"),
            "/out",
        );
        assert!(controller.submit_job(params).is_err());
        assert!(controller.is_empty());
    }
}
