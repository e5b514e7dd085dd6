//! # Job Storage
//!
//! Durable storage for the priority job queue. The queue engine lives in
//! `atlas-jobs`; this repository owns the SQL, and in particular the two
//! statements the queue's correctness rests on:
//!
//! ## Atomic Claim
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Many workers poll concurrently. Each claim is ONE statement:           │
//! │                                                                         │
//! │  UPDATE jobs SET status='processing', claimed_by=<worker> ...           │
//! │  WHERE id = (SELECT id FROM jobs                                        │
//! │              WHERE status='pending' AND run_at <= now                   │
//! │              ORDER BY priority, created_at, id LIMIT 1)                 │
//! │  RETURNING *                                                            │
//! │                                                                         │
//! │  The subselect and the status flip happen inside one statement, so no   │
//! │  two workers can ever claim the same job. Lower priority value wins;    │
//! │  ties break FIFO by created_at.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomic Requeue-or-Fail
//! A failed attempt increments `attempts` and either requeues the job with a
//! future `run_at` (backoff) or marks it terminally failed, decided by a CASE
//! inside the same UPDATE. Exactly `max_attempts` executions ever happen.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use atlas_core::{Job, JobStatus, QueueStats};

use crate::error::{DbError, DbResult};

const JOB_COLUMNS: &str = r#"
    id, job_type, payload, status, attempts, max_attempts, priority,
    claimed_by, last_error, run_at, created_at, updated_at
"#;

/// Repository for durable job rows.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Creates a new JobRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JobRepository { pool }
    }

    /// Persists a new job. The caller (the queue) constructs and validates it.
    pub async fn insert(&self, job: &Job) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, job_type, payload, status, attempts, max_attempts, priority,
                claimed_by, last_error, run_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&job.id)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(job.status)
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(job.priority)
        .bind(&job.claimed_by)
        .bind(&job.last_error)
        .bind(job.run_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(job_id = %job.id, job_type = %job.job_type, priority = job.priority, "Job enqueued");
        Ok(())
    }

    /// Claims the most urgent eligible job for a worker, if any.
    ///
    /// Eligible means `status = pending` and `run_at` has passed. Selection
    /// order is priority ascending (lower = more urgent), then FIFO. The
    /// claim is a single UPDATE, so concurrent workers never double-claim.
    pub async fn claim_next(&self, worker_id: &str) -> DbResult<Option<Job>> {
        let now = Utc::now();
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs SET
                status = 'processing',
                claimed_by = ?1,
                updated_at = ?2
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'pending' AND run_at <= ?2
                ORDER BY priority ASC, created_at ASC, id ASC
                LIMIT 1
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref job) = job {
            debug!(job_id = %job.id, worker_id = %worker_id, "Job claimed");
        }
        Ok(job)
    }

    /// Marks a processing job as successfully completed.
    pub async fn mark_completed(&self, job_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', updated_at = ?2 WHERE id = ?1 AND status = 'processing'",
        )
        .bind(job_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Processing job", job_id));
        }
        Ok(())
    }

    /// Records a failed attempt: requeues with backoff, or fails terminally
    /// once attempts reach `max_attempts`. Returns the resulting status.
    ///
    /// `next_run_at` is the backoff gate the queue computed; it is only
    /// applied on the requeue branch.
    pub async fn mark_failed_or_requeue(
        &self,
        job_id: &str,
        error: &str,
        next_run_at: DateTime<Utc>,
    ) -> DbResult<JobStatus> {
        let status = sqlx::query_scalar::<_, JobStatus>(
            r#"
            UPDATE jobs SET
                attempts = attempts + 1,
                status = CASE WHEN attempts + 1 >= max_attempts
                              THEN 'failed' ELSE 'pending' END,
                run_at = CASE WHEN attempts + 1 >= max_attempts
                              THEN run_at ELSE ?3 END,
                last_error = ?2,
                claimed_by = NULL,
                updated_at = ?4
            WHERE id = ?1 AND status = 'processing'
            RETURNING status
            "#,
        )
        .bind(job_id)
        .bind(error)
        .bind(next_run_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Processing job", job_id))?;

        debug!(job_id = %job_id, status = ?status, "Job attempt failed");
        Ok(status)
    }

    /// Fails a processing job immediately, bypassing the retry budget.
    ///
    /// For jobs that can never succeed no matter how often they run: no
    /// handler registered for the type, or an unparseable payload.
    pub async fn mark_failed_terminal(&self, job_id: &str, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = 'failed',
                attempts = attempts + 1,
                last_error = ?2,
                claimed_by = NULL,
                updated_at = ?3
            WHERE id = ?1 AND status = 'processing'
            "#,
        )
        .bind(job_id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Processing job", job_id));
        }
        Ok(())
    }

    /// Gets a job by ID.
    pub async fn get(&self, job_id: &str) -> DbResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    /// Aggregate counts per status.
    pub async fn stats(&self) -> DbResult<QueueStats> {
        let rows: Vec<(JobStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            stats.total += count;
            match status {
                JobStatus::Pending => stats.pending = count,
                JobStatus::Processing => stats.processing = count,
                JobStatus::Completed => stats.completed = count,
                JobStatus::Failed => stats.failed = count,
            }
        }
        Ok(stats)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn make_job(job_type: &str, priority: i64, created_at: DateTime<Utc>) -> Job {
        Job {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            payload: "{}".to_string(),
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: 3,
            priority,
            claimed_by: None,
            last_error: None,
            run_at: created_at,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_claim_order_is_priority_then_fifo() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let jobs = db.jobs();

        let base = Utc::now() - ChronoDuration::seconds(10);
        let old_low = make_job("report", 3, base);
        let newer_low = make_job("report", 3, base + ChronoDuration::seconds(1));
        let urgent = make_job("email", 1, base + ChronoDuration::seconds(2));
        jobs.insert(&old_low).await.unwrap();
        jobs.insert(&newer_low).await.unwrap();
        jobs.insert(&urgent).await.unwrap();

        // Urgent job first despite being enqueued last...
        let first = jobs.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(first.id, urgent.id);
        assert_eq!(first.status, JobStatus::Processing);
        assert_eq!(first.claimed_by.as_deref(), Some("w1"));

        // ...then FIFO within equal priority.
        let second = jobs.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(second.id, old_low.id);
        let third = jobs.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(third.id, newer_low.id);

        assert!(jobs.claim_next("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_future_run_at_is_not_claimable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let jobs = db.jobs();

        let mut job = make_job("email", 3, Utc::now());
        job.run_at = Utc::now() + ChronoDuration::minutes(5);
        jobs.insert(&job).await.unwrap();

        assert!(jobs.claim_next("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_transitions_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let jobs = db.jobs();

        let job = make_job("email", 3, Utc::now() - ChronoDuration::seconds(1));
        jobs.insert(&job).await.unwrap();
        let claimed = jobs.claim_next("w1").await.unwrap().unwrap();

        jobs.mark_completed(&claimed.id).await.unwrap();
        let stored = jobs.get(&claimed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);

        // Completing a job that is no longer processing is an error.
        let err = jobs.mark_completed(&claimed.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_failed_attempt_requeues_then_fails_terminally() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let jobs = db.jobs();

        let mut job = make_job("email", 3, Utc::now() - ChronoDuration::seconds(1));
        job.max_attempts = 2;
        jobs.insert(&job).await.unwrap();

        // First failure: requeued with the backoff gate applied.
        let claimed = jobs.claim_next("w1").await.unwrap().unwrap();
        let gate = Utc::now() - ChronoDuration::milliseconds(1); // already eligible
        let status = jobs
            .mark_failed_or_requeue(&claimed.id, "timeout", gate)
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Pending);

        let stored = jobs.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.last_error.as_deref(), Some("timeout"));
        assert!(stored.claimed_by.is_none());

        // Second failure exhausts max_attempts: terminal.
        let claimed = jobs.claim_next("w2").await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        let status = jobs
            .mark_failed_or_requeue(&claimed.id, "still broken", gate)
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Failed);

        let stored = jobs.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 2);
        assert_eq!(stored.last_error.as_deref(), Some("still broken"));
        assert!(jobs.claim_next("w3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminal_failure_ignores_retry_budget() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let jobs = db.jobs();

        let job = make_job("no-such-type", 3, Utc::now() - ChronoDuration::seconds(1));
        jobs.insert(&job).await.unwrap();
        let claimed = jobs.claim_next("w1").await.unwrap().unwrap();

        jobs.mark_failed_terminal(&claimed.id, "no handler registered")
            .await
            .unwrap();

        let stored = jobs.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.attempts, 1);
        assert!(stored.max_attempts > stored.attempts); // budget not exhausted
        assert!(jobs.claim_next("w2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats_counts_by_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let jobs = db.jobs();

        let base = Utc::now() - ChronoDuration::seconds(1);
        for i in 0..3 {
            jobs.insert(&make_job("email", 3, base + ChronoDuration::milliseconds(i)))
                .await
                .unwrap();
        }
        let claimed = jobs.claim_next("w1").await.unwrap().unwrap();
        jobs.mark_completed(&claimed.id).await.unwrap();
        jobs.claim_next("w1").await.unwrap().unwrap();

        let stats = jobs.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 0);
    }
}
