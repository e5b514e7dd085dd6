//! # Job Queue
//!
//! The public face of the queue: enqueue jobs, inspect them, and run the
//! worker pool that executes them.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  STARTUP                                                                │
//! │    registry.register("send-email", ...)                                 │
//! │    let queue = JobQueue::new(db, registry, config);                     │
//! │    let handle = queue.start();          // spawns worker_count workers  │
//! │                                                                         │
//! │  RUNTIME                                                                │
//! │    queue.enqueue("send-email", &payload, opts).await?  → job id         │
//! │    queue.stats().await?                 → pending/processing/...        │
//! │    queue.get_job(&id).await?            → status, attempts, last_error  │
//! │                                                                         │
//! │  SHUTDOWN                                                               │
//! │    handle.shutdown().await;             // workers finish current job   │
//! │                                                                         │
//! │  Jobs are durable rows: anything pending at shutdown is picked up on    │
//! │  the next start. A job claimed by a crashed process stays 'processing'  │
//! │  (operator visibility) rather than being silently re-run.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use atlas_core::validation::{validate_job_type, validate_max_attempts, validate_priority};
use atlas_core::{Job, JobStatus, QueueStats, DEFAULT_JOB_MAX_ATTEMPTS, DEFAULT_JOB_PRIORITY};
use atlas_db::Database;

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::handler::HandlerRegistry;
use crate::worker::Worker;

/// Per-job overrides for [`JobQueue::enqueue`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Priority 0-9, lower = more urgent. Default: 3.
    pub priority: Option<i64>,

    /// Maximum executions before the job fails terminally, 1-10. Default: 3.
    pub max_attempts: Option<i64>,
}

/// Priority job queue over durable storage.
#[derive(Clone)]
pub struct JobQueue {
    db: Database,
    registry: Arc<HandlerRegistry>,
    config: Arc<QueueConfig>,
}

impl JobQueue {
    /// Creates a queue. The registry is fixed at construction; every type
    /// that will ever be enqueued must already be registered.
    pub fn new(db: Database, registry: HandlerRegistry, config: QueueConfig) -> Self {
        JobQueue {
            db,
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    /// Enqueues a job, returning its ID.
    ///
    /// The payload is serialized to JSON and stored verbatim; workers hand
    /// it back to the handler untouched. Unknown job types are rejected here
    /// rather than left to fail on a worker.
    pub async fn enqueue<T: Serialize + ?Sized>(
        &self,
        job_type: &str,
        payload: &T,
        options: EnqueueOptions,
    ) -> QueueResult<String> {
        validate_job_type(job_type)?;

        let priority = options.priority.unwrap_or(DEFAULT_JOB_PRIORITY);
        validate_priority(priority)?;
        let max_attempts = options.max_attempts.unwrap_or(DEFAULT_JOB_MAX_ATTEMPTS);
        validate_max_attempts(max_attempts)?;

        if !self.registry.contains(job_type) {
            return Err(QueueError::UnknownJobType(job_type.to_string()));
        }

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            payload: serde_json::to_string(payload)?,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts,
            priority,
            claimed_by: None,
            last_error: None,
            run_at: now,
            created_at: now,
            updated_at: now,
        };

        self.db.jobs().insert(&job).await?;
        Ok(job.id)
    }

    /// Gets a job by ID (status, attempts, last_error, ...).
    pub async fn get_job(&self, job_id: &str) -> QueueResult<Option<Job>> {
        Ok(self.db.jobs().get(job_id).await?)
    }

    /// Aggregate queue counts.
    pub async fn stats(&self) -> QueueResult<QueueStats> {
        Ok(self.db.jobs().stats().await?)
    }

    /// Spawns the worker pool. Call once; returns the handle that stops it.
    pub fn start(&self) -> QueueHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for i in 0..self.config.worker_count {
            let worker = Worker::new(
                format!("worker-{i}"),
                self.db.clone(),
                self.registry.clone(),
                self.config.clone(),
                shutdown_rx.clone(),
            );
            workers.push(tokio::spawn(worker.run()));
        }

        info!(
            workers = self.config.worker_count,
            job_types = ?self.registry.job_types(),
            "Job queue started"
        );

        QueueHandle {
            shutdown_tx,
            workers,
        }
    }
}

/// Handle controlling a running worker pool.
pub struct QueueHandle {
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl QueueHandle {
    /// Signals shutdown and waits for every worker to finish its current
    /// job and exit.
    pub async fn shutdown(self) {
        info!("Job queue shutting down");
        let _ = self.shutdown_tx.send(true);

        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(?e, "Worker task panicked during shutdown");
            }
        }
        info!("Job queue stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
