//! Queue and handler error types.

use thiserror::Error;

use atlas_core::error::ValidationError;
use atlas_db::DbError;

/// Errors surfaced by the queue's public operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Bad enqueue input (empty type, priority/attempts out of bounds).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No handler is registered for the job type.
    #[error("No handler registered for job type: {0}")]
    UnknownJobType(String),

    /// The payload could not be serialized to JSON.
    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Failure reported by a job handler. Opaque to the queue; it is recorded
/// verbatim as the job's `last_error` and counts against the retry budget.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Creates a handler error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError(message.into())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError(format!("payload decode failed: {err}"))
    }
}
