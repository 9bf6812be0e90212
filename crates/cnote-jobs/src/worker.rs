//! Polling job worker.
//!
//! Claims one job at a time from the durable queue and dispatches it to
//! the registered handler. A transient handler failure returns the job
//! to the queue; the repository gives up once the attempt budget is
//! exhausted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use cnote_core::{defaults, Job, JobRepository, JobType};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `JOB_WORKER_ENABLED` | `true` |
    /// | `JOB_POLL_INTERVAL_MS` | `500` |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            enabled,
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Job worker that processes jobs from the queue.
pub struct JobWorker {
    jobs: Arc<dyn JobRepository>,
    config: WorkerConfig,
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl JobWorker {
    /// Create a new job worker.
    pub fn new(jobs: Arc<dyn JobRepository>, config: WorkerConfig) -> Self {
        Self {
            jobs,
            config,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for its job type.
    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        let job_type = handler.job_type();
        self.handlers.insert(job_type, Arc::new(handler));
        debug!(?job_type, "Registered job handler");
        self
    }

    /// Start the worker on a background task and return a control handle.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle { shutdown_tx }
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Job worker started"
        );

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match self.jobs.claim_next().await {
                Ok(Some(job)) => {
                    self.execute_job(job).await;
                    // Drain the queue before sleeping again.
                }
                Ok(None) => {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = sleep(poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to claim job");
                    sleep(poll_interval).await;
                }
            }
        }

        info!("Job worker stopped");
    }

    /// Execute a single claimed job and record the outcome.
    async fn execute_job(&self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;
        let job_type = job.job_type;

        info!(
            %job_id,
            note_id = %job.note_id,
            ?job_type,
            attempt = job.attempts,
            "Processing job"
        );

        let result = match self.handlers.get(&job_type) {
            Some(handler) => handler.execute(JobContext::new(job)).await,
            None => JobResult::Failed(format!("No handler for job type: {:?}", job_type)),
        };

        let outcome = match result {
            JobResult::Success(_) => {
                info!(
                    %job_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job completed"
                );
                self.jobs.complete(job_id).await
            }
            JobResult::Failed(error) => {
                warn!(%job_id, %error, "Job failed permanently");
                self.jobs.fail(job_id, &error, false).await
            }
            JobResult::Retry(error) => {
                warn!(%job_id, %error, "Job failed, returning to queue");
                self.jobs.fail(job_id, &error, true).await
            }
        };

        if let Err(e) = outcome {
            error!(%job_id, error = %e, "Failed to record job outcome");
        }
    }
}
