//! Queue engine configuration.

use std::time::Duration;

/// Configuration for the queue's worker pool and retry timing.
///
/// ## Example
/// ```rust,ignore
/// let config = QueueConfig::default()
///     .worker_count(8)
///     .poll_interval(Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of worker tasks polling for jobs.
    /// Default: 4
    pub worker_count: usize,

    /// How often an idle worker polls for new work.
    /// Default: 500 milliseconds
    pub poll_interval: Duration,

    /// Wall-clock budget for one handler execution; exceeding it counts as
    /// a failed attempt.
    /// Default: 30 seconds
    pub attempt_timeout: Duration,

    /// Backoff delay after the first failed attempt; doubles per attempt.
    /// Default: 1 second
    pub backoff_base: Duration,

    /// Upper bound on the backoff delay.
    /// Default: 60 seconds
    pub backoff_cap: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            worker_count: 4,
            poll_interval: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(30),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(60),
        }
    }
}

impl QueueConfig {
    /// Sets the number of worker tasks.
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Sets the idle poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the per-attempt execution timeout.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Sets the backoff base delay.
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the backoff cap.
    pub fn backoff_cap(mut self, cap: Duration) -> Self {
        self.backoff_cap = cap;
        self
    }
}
