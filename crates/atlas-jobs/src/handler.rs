//! # Job Handlers
//!
//! The seam between the queue engine and application code. A handler is
//! registered once per job type; workers look it up by the job's type tag
//! and hand it the raw JSON payload.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::HandlerError;

/// Processes one job payload.
///
/// Implementations must be idempotent where possible: a job whose handler
/// succeeded but whose completion write was lost (crash) will run again.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Executes one attempt. An `Err` counts against the job's retry budget.
    async fn handle(&self, payload: Value) -> Result<(), HandlerError>;
}

/// Adapts an async closure into a [`JobHandler`].
///
/// ## Example
/// ```rust,ignore
/// registry.register("send-email", FnHandler::new(|payload| async move {
///     let email: EmailPayload = serde_json::from_value(payload)?;
///     mailer.send(email).await.map_err(|e| HandlerError::new(e.to_string()))
/// }));
/// ```
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    /// Wraps an async closure.
    pub fn new(f: F) -> Self {
        FnHandler { f }
    }
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, payload: Value) -> Result<(), HandlerError> {
        (self.f)(payload).await
    }
}

/// Maps job type tags to their handlers.
///
/// Built once at startup, then shared read-only across workers. A job whose
/// type has no entry here fails terminally (retrying cannot help it).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a job type, replacing any previous one.
    pub fn register(&mut self, job_type: impl Into<String>, handler: impl JobHandler + 'static) {
        self.handlers.insert(job_type.into(), Arc::new(handler));
    }

    /// Looks up the handler for a job type.
    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    /// Whether a handler is registered for the job type.
    pub fn contains(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Registered job types, for logging at startup.
    pub fn job_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}
