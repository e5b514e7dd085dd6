//! # Queue Workers
//!
//! Each worker is a spawned task that polls for eligible jobs, runs their
//! handlers under a timeout, and records the outcome.
//!
//! ## Worker Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  loop {                                                                 │
//! │      tick (poll_interval)  ──► drain: claim ─► run ─► record, repeat    │
//! │                                 until the store has nothing eligible    │
//! │      shutdown signal       ──► finish current job, exit                 │
//! │  }                                                                      │
//! │                                                                         │
//! │  OUTCOME RECORDING (one of):                                            │
//! │  • handler Ok          → completed                                      │
//! │  • handler Err/timeout → attempts+1; requeue at now+backoff, or         │
//! │                          terminal 'failed' once the budget is spent     │
//! │  • no handler / bad payload → terminal 'failed' immediately             │
//! │                          (a retry cannot fix either)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Claims are atomic in the store, so any number of workers can poll the
//! same database without double-processing.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use atlas_core::Job;
use atlas_db::{Database, DbResult};

use crate::config::QueueConfig;
use crate::handler::HandlerRegistry;

/// One polling worker. Spawned by `JobQueue::start`.
pub(crate) struct Worker {
    id: String,
    db: Database,
    registry: Arc<HandlerRegistry>,
    config: Arc<QueueConfig>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Worker {
    pub(crate) fn new(
        id: String,
        db: Database,
        registry: Arc<HandlerRegistry>,
        config: Arc<QueueConfig>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Worker {
            id,
            db,
            registry,
            config,
            shutdown_rx,
        }
    }

    /// Runs the worker loop until shutdown. Spawned as a background task.
    pub(crate) async fn run(mut self) {
        debug!(worker_id = %self.id, "Worker starting");

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.drain().await {
                        error!(worker_id = %self.id, ?e, "Worker poll failed");
                    }
                }

                result = self.shutdown_rx.changed() => {
                    // A closed channel means the queue handle was dropped;
                    // treat it the same as an explicit shutdown.
                    if result.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        debug!(worker_id = %self.id, "Worker stopped");
    }

    /// Claims and processes jobs until the store has nothing eligible.
    async fn drain(&self) -> DbResult<()> {
        loop {
            if *self.shutdown_rx.borrow() {
                return Ok(());
            }

            match self.db.jobs().claim_next(&self.id).await? {
                Some(job) => self.process(job).await?,
                None => return Ok(()),
            }
        }
    }

    /// Runs one claimed job to an outcome.
    async fn process(&self, job: Job) -> DbResult<()> {
        let jobs = self.db.jobs();

        let handler = match self.registry.get(&job.job_type) {
            Some(handler) => handler,
            None => {
                warn!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    "No handler registered, failing job"
                );
                return jobs
                    .mark_failed_terminal(
                        &job.id,
                        &format!("no handler registered for job type '{}'", job.job_type),
                    )
                    .await;
            }
        };

        let payload: Value = match serde_json::from_str(&job.payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(job_id = %job.id, ?e, "Unparseable payload, failing job");
                return jobs
                    .mark_failed_terminal(&job.id, &format!("payload decode failed: {e}"))
                    .await;
            }
        };

        debug!(
            worker_id = %self.id,
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts + 1,
            "Executing job"
        );

        match timeout(self.config.attempt_timeout, handler.handle(payload)).await {
            Ok(Ok(())) => {
                info!(job_id = %job.id, job_type = %job.job_type, "Job completed");
                jobs.mark_completed(&job.id).await
            }
            Ok(Err(e)) => self.record_failure(&job, e.to_string()).await,
            Err(_) => {
                // A hung handler consumes its attempt like any other failure.
                self.record_failure(
                    &job,
                    format!(
                        "attempt timed out after {}ms",
                        self.config.attempt_timeout.as_millis()
                    ),
                )
                .await
            }
        }
    }

    async fn record_failure(&self, job: &Job, error: String) -> DbResult<()> {
        let attempt = job.attempts + 1;
        let delay = backoff_delay(self.config.backoff_base, self.config.backoff_cap, attempt);
        let next_run_at = Utc::now() + chrono::Duration::milliseconds(delay.as_millis() as i64);

        let status = self
            .db
            .jobs()
            .mark_failed_or_requeue(&job.id, &error, next_run_at)
            .await?;

        warn!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = attempt,
            max_attempts = job.max_attempts,
            status = ?status,
            error = %error,
            "Job attempt failed"
        );
        Ok(())
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped.
///
/// `attempt` is the number of the attempt that just failed (1-based), so the
/// first failure waits `base`, the second `2*base`, and so on.
pub(crate) fn backoff_delay(base: Duration, cap: Duration, attempt: i64) -> Duration {
    // Clamp the exponent; past 2^16 every realistic base has hit the cap.
    let exp = attempt.saturating_sub(1).clamp(0, 16) as u32;
    base.checked_mul(1u32 << exp).map_or(cap, |d| d.min(cap))
}
