//! # atlas-core: Pure Domain Logic for the Atlas POS Concurrency Core
//!
//! This crate is the I/O-free foundation of the Atlas POS locking and
//! queueing subsystem. Everything here is testable without a database,
//! a runtime, or a clock you can't control.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Atlas POS Concurrency Core                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Route handlers (EXTERNAL, not here)               │   │
//! │  │   start shift ─► move stock ─► rate-limit check ─► enqueue job  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atlas-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │   types   │  │ quantity  │  │ ratelimit │  │ validation│   │   │
//! │  │   │  Session  │  │ Quantity  │  │  sliding  │  │   rules   │   │   │
//! │  │   │ StockRec  │  │ hundredths│  │  window   │  │  checks   │   │   │
//! │  │   │   Job     │  │           │  │           │  │           │   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    atlas-db (Database Layer)                     │   │
//! │  │     session manager, transfer locker, job store (SQLite)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Register, Session, StockRecord, Job, ...)
//! - [`quantity`] - Stock quantity as integer hundredths (no floating point!)
//! - [`ratelimit`] - Sliding-window rate limiter (in-process)
//! - [`error`] - Validation error taxonomy
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Integer quantities**: stock moves in hundredths (i64), the same
//!    discipline as integer-cents money — no float drift in the ledger
//! 2. **Explicit errors**: all errors are typed enums, never strings or panics
//! 3. **Injectable time**: the rate limiter takes an explicit instant
//!    internally so tests never sleep

pub mod error;
pub mod quantity;
pub mod ratelimit;
pub mod types;
pub mod validation;

// Re-exports for convenience: `use atlas_core::Session` instead of
// `use atlas_core::types::Session`.
pub use error::ValidationError;
pub use quantity::Quantity;
pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use types::*;

/// Default tenant ID for single-tenant deployments and seed tooling.
///
/// The schema is multi-tenant throughout (every row carries tenant_id), but
/// a standalone store runs with this fixed tenant until tenant resolution is
/// wired in by the hosting application.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Default job priority (lower value = more urgent).
///
/// Mid-value default so callers can go both ways: notification jobs commonly
/// override to 2, bulk maintenance to 5+.
pub const DEFAULT_JOB_PRIORITY: i64 = 3;

/// Default maximum attempts before a job is marked failed.
pub const DEFAULT_JOB_MAX_ATTEMPTS: i64 = 3;

/// Maximum accepted length of any caller-supplied identifier.
pub const MAX_IDENTIFIER_LEN: usize = 64;
