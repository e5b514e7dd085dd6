//! # Repository Layer
//!
//! One repository per aggregate, each owning its SQL:
//!
//! - [`register`] - register provisioning and lookup
//! - [`session`] - the register session manager (atomic get-or-create)
//! - [`stock`] - the inventory transfer locker
//! - [`job`] - durable job storage for the atlas-jobs queue
//!
//! Repositories are cheap handles over the shared pool; `Database` hands out
//! a fresh one per call.

pub mod job;
pub mod register;
pub mod session;
pub mod stock;
