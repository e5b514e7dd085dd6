//! # atlas-jobs: Priority Job Queue for Atlas POS
//!
//! Durable background work with priorities, bounded retries, and exponential
//! backoff, on top of the `atlas-db` job store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Job Queue Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     JobQueue (Public API)                        │  │
//! │  │                                                                  │  │
//! │  │  enqueue(type, payload, opts)  stats()  get_job(id)  start()     │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     jobs table (atlas-db)                        │  │
//! │  │                                                                  │  │
//! │  │  pending ──claim──► processing ──ok──► completed                 │  │
//! │  │     ▲                    │                                       │  │
//! │  │     └─── requeue+backoff ┤ (attempts < max_attempts)             │  │
//! │  │                          └──exhausted──► failed                  │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ atomic claim (one UPDATE)               │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────┐        ┌────────────┐        ┌────────────┐            │
//! │  │  Worker 0  │        │  Worker 1  │  ...   │  Worker N  │            │
//! │  │            │        │            │        │            │            │
//! │  │ poll, run  │        │ poll, run  │        │ poll, run  │            │
//! │  │ handler    │        │ handler    │        │ handler    │            │
//! │  │ w/ timeout │        │ w/ timeout │        │ w/ timeout │            │
//! │  └────────────┘        └────────────┘        └────────────┘            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              HandlerRegistry (application code)                  │  │
//! │  │   "send-email" → EmailHandler   "generate-report" → Report...    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`queue`] - `JobQueue` public API and the worker-pool handle
//! - [`worker`] - polling workers and the backoff schedule
//! - [`handler`] - the `JobHandler` trait and registry
//! - [`config`] - worker-pool and retry timing configuration
//! - [`error`] - queue and handler error types
//!
//! ## Guarantees
//! - A job is executed by at most one worker at a time (atomic claim)
//! - A job never executes more than `max_attempts` times
//! - Failed attempts wait `base * 2^(attempt-1)` (capped) before the retry
//! - Jobs survive restarts; the queue is exactly as durable as its database

pub mod config;
pub mod error;
pub mod handler;
pub mod queue;
mod worker;

pub use config::QueueConfig;
pub use error::{HandlerError, QueueError, QueueResult};
pub use handler::{FnHandler, HandlerRegistry, JobHandler};
pub use queue::{EnqueueOptions, JobQueue, QueueHandle};
