//! # Sliding-Window Rate Limiter
//!
//! In-process admission control for sensitive or expensive endpoints.
//!
//! ## True Sliding Window
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FIXED BUCKETS (what this is NOT)                                       │
//! │                                                                         │
//! │    |----min 1----|----min 2----|                                        │
//! │     59 requests ^^ 59 requests   → 118 requests in ~2 seconds at the    │
//! │                                     bucket boundary. Quota defeated.    │
//! │                                                                         │
//! │  SLIDING WINDOW (this module)                                           │
//! │                                                                         │
//! │              now - window ◄──────────── now                             │
//! │    ──x───x──│──x────x───x───x───────────│                               │
//! │      dropped│        these count        │                               │
//! │                                                                         │
//! │  Only timestamps strictly inside (now - window, now] count toward the   │
//! │  quota, independent of wall-clock alignment.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scope
//! The store is process-local. A multi-process deployment enforces each
//! process's window independently; back this interface with a shared counter
//! store if a global quota is ever required. Callers translate a rejected
//! check into a 429-equivalent response; this module never errors.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

// =============================================================================
// Configuration
// =============================================================================

/// A `{window, max_requests}` admission policy.
///
/// Named policies are just different config values; there is one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of the sliding window.
    pub window: Duration,

    /// Maximum admitted requests inside one window.
    pub max_requests: usize,
}

impl RateLimitConfig {
    /// Creates a policy from a window and quota.
    pub const fn new(window: Duration, max_requests: usize) -> Self {
        RateLimitConfig {
            window,
            max_requests,
        }
    }

    /// Strict policy for expensive endpoints: 10 requests per minute.
    pub const fn strict() -> Self {
        RateLimitConfig::new(Duration::from_secs(60), 10)
    }

    /// Standard policy: 60 requests per minute.
    pub const fn standard() -> Self {
        RateLimitConfig::new(Duration::from_secs(60), 60)
    }

    /// Authentication policy: 5 attempts per 15 minutes.
    pub const fn auth() -> Self {
        RateLimitConfig::new(Duration::from_secs(15 * 60), 5)
    }
}

// =============================================================================
// Rate Limiter
// =============================================================================

/// Per-identifier sliding-window counter store.
///
/// Construct one per process (or per dependency-injection scope) and pass it
/// explicitly; the store is deliberately not a module-level global.
///
/// ## Usage
/// ```rust
/// use atlas_core::ratelimit::{RateLimitConfig, RateLimiter};
///
/// let limiter = RateLimiter::new();
/// let policy = RateLimitConfig::standard();
///
/// if limiter.check("user-1", &policy) {
///     // admitted: proceed with the expensive call
/// } else {
///     // rejected: surface "try again shortly" with limiter.remaining(...)
/// }
/// ```
#[derive(Debug, Default)]
pub struct RateLimiter {
    /// Identifier → timestamps of admitted requests, oldest first.
    /// Entries whose history has fully expired are pruned to bound memory.
    entries: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    /// Creates an empty limiter.
    pub fn new() -> Self {
        RateLimiter::default()
    }

    /// Admits or rejects one request for `identifier` under `config`.
    ///
    /// Returns `true` and records the request if the identifier has quota
    /// left; returns `false` WITHOUT recording otherwise (a rejected request
    /// must not extend the window against the caller).
    pub fn check(&self, identifier: &str, config: &RateLimitConfig) -> bool {
        self.check_at(identifier, config, Instant::now())
    }

    /// Remaining quota for `identifier` under `config`, never negative.
    pub fn remaining(&self, identifier: &str, config: &RateLimitConfig) -> usize {
        self.remaining_at(identifier, config, Instant::now())
    }

    /// Drops all history for one identifier.
    pub fn reset(&self, identifier: &str) {
        self.lock_entries().remove(identifier);
    }

    /// Drops all identifiers. Used by tests and administrative resets.
    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    // -------------------------------------------------------------------------
    // Clock-injected internals (tests drive these directly, no sleeping)
    // -------------------------------------------------------------------------

    fn check_at(&self, identifier: &str, config: &RateLimitConfig, now: Instant) -> bool {
        let mut entries = self.lock_entries();
        let stamps = entries.entry(identifier.to_string()).or_default();

        // Strict boundary: a timestamp exactly `window` old no longer counts.
        stamps.retain(|t| now.duration_since(*t) < config.window);

        if stamps.len() >= config.max_requests {
            return false;
        }

        stamps.push(now);
        true
    }

    fn remaining_at(&self, identifier: &str, config: &RateLimitConfig, now: Instant) -> usize {
        let mut entries = self.lock_entries();

        let count = match entries.get_mut(identifier) {
            Some(stamps) => {
                stamps.retain(|t| now.duration_since(*t) < config.window);
                if stamps.is_empty() {
                    entries.remove(identifier);
                    0
                } else {
                    stamps.len()
                }
            }
            None => 0,
        };

        config.max_requests.saturating_sub(count)
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        // A poisoned map only means another thread panicked mid-update; the
        // data is still a valid history, so recover it.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: RateLimitConfig = RateLimitConfig::new(Duration::from_millis(60_000), 5);

    #[test]
    fn test_admits_up_to_quota_then_rejects() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at("user1", &CFG, now));
        }
        assert!(!limiter.check_at("user1", &CFG, now));
        assert_eq!(limiter.remaining_at("user1", &CFG, now), 0);
    }

    #[test]
    fn test_rejected_request_is_not_recorded() {
        let limiter = RateLimiter::new();
        let cfg = RateLimitConfig::new(Duration::from_millis(1000), 1);
        let base = Instant::now();

        assert!(limiter.check_at("a", &cfg, base));
        // Hammering while rejected must not push the window forward.
        for ms in 1..5 {
            assert!(!limiter.check_at("a", &cfg, base + Duration::from_millis(ms)));
        }
        // One window after the ADMITTED request, quota is back.
        assert!(limiter.check_at("a", &cfg, base + Duration::from_millis(1000)));
    }

    #[test]
    fn test_window_boundary_is_strict() {
        let limiter = RateLimiter::new();
        let cfg = RateLimitConfig::new(Duration::from_millis(1000), 1);
        let base = Instant::now();

        assert!(limiter.check_at("a", &cfg, base));
        // 999ms later the original stamp still counts.
        assert!(!limiter.check_at("a", &cfg, base + Duration::from_millis(999)));
        // Exactly window later it is excluded (strict comparison).
        assert!(limiter.check_at("a", &cfg, base + Duration::from_millis(1000)));
    }

    #[test]
    fn test_sliding_not_bucketed() {
        let limiter = RateLimiter::new();
        let cfg = RateLimitConfig::new(Duration::from_millis(1000), 2);
        let base = Instant::now();

        assert!(limiter.check_at("a", &cfg, base));
        assert!(limiter.check_at("a", &cfg, base + Duration::from_millis(600)));
        // At base+1100 the first stamp expired but the second has not:
        // exactly one slot is free, not a fresh bucket of two.
        assert!(limiter.check_at("a", &cfg, base + Duration::from_millis(1100)));
        assert!(!limiter.check_at("a", &cfg, base + Duration::from_millis(1150)));
    }

    #[test]
    fn test_identifiers_are_isolated() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at("user-a", &CFG, now));
        }
        assert!(!limiter.check_at("user-a", &CFG, now));

        // user-b is untouched by user-a's history.
        assert_eq!(limiter.remaining_at("user-b", &CFG, now), 5);
        assert!(limiter.check_at("user-b", &CFG, now));
    }

    #[test]
    fn test_reset_and_clear() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.check_at("a", &CFG, now));
        assert!(limiter.check_at("b", &CFG, now));

        limiter.reset("a");
        assert_eq!(limiter.remaining_at("a", &CFG, now), 5);
        assert_eq!(limiter.remaining_at("b", &CFG, now), 4);

        limiter.clear();
        assert_eq!(limiter.remaining_at("b", &CFG, now), 5);
    }

    #[test]
    fn test_named_policies() {
        assert_eq!(RateLimitConfig::strict().max_requests, 10);
        assert_eq!(RateLimitConfig::standard().max_requests, 60);
        assert_eq!(RateLimitConfig::auth().max_requests, 5);
        assert_eq!(RateLimitConfig::auth().window, Duration::from_secs(900));
    }

    #[test]
    fn test_expired_history_is_pruned() {
        let limiter = RateLimiter::new();
        let cfg = RateLimitConfig::new(Duration::from_millis(10), 5);
        let base = Instant::now();

        assert!(limiter.check_at("a", &cfg, base));
        // After everything expires, remaining() prunes the empty entry.
        assert_eq!(limiter.remaining_at("a", &cfg, base + Duration::from_millis(20)), 5);
        assert!(limiter.lock_entries().is_empty());
    }
}
