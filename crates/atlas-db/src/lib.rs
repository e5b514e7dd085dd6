//! # atlas-db: SQLite Persistence for the Atlas POS Concurrency Core
//!
//! Every SQL statement and every critical section in the subsystem lives in
//! this crate. The three consistency-critical operations are:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         atlas-db Operations                             │
//! │                                                                         │
//! │  SessionRepository::get_or_create_session                               │
//! │  └── exactly one open session per register, under concurrent            │
//! │      terminal start-up (write lock, or optimistic fallback)             │
//! │                                                                         │
//! │  StockRepository::transfer                                              │
//! │  └── all-or-nothing stock movement between two locations with an        │
//! │      audit row, failing fast into `conflict` under contention           │
//! │                                                                         │
//! │  JobRepository::claim_next                                              │
//! │  └── atomic claim of the most urgent eligible job (one UPDATE,          │
//! │      priority then FIFO), consumed by the atlas-jobs workers            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking model
//!
//! SQLite serializes writers with a database-level write lock rather than row
//! locks, so the `SELECT ... FOR UPDATE` idiom becomes `BEGIN IMMEDIATE`: the
//! transaction takes the writer slot up front and every step until COMMIT is
//! atomic with respect to other writers. The [`locking`] module makes that
//! discipline explicit at the call site; see its docs for the busy-timeout
//! policy (sessions wait briefly, transfers fail fast).

pub mod error;
mod locking;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult, SessionError, TransferError};
pub use pool::{Database, DbConfig};
pub use repository::job::JobRepository;
pub use repository::register::RegisterRepository;
pub use repository::session::{SessionRepository, SessionStrategy};
pub use repository::stock::StockRepository;
