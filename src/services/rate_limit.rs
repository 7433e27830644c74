//! Attempt limiting for the second-factor login step.
//!
//! The limiter is a trait so a multi-instance deployment can back it with a
//! shared TTL store; [`InMemoryLimiter`] keeps state per process.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

pub const MAX_ATTEMPTS: usize = 5;
pub const WINDOW: Duration = Duration::from_secs(5 * 60);

pub trait AttemptLimiter: Send + Sync {
    /// Record an attempt for `key` at `now`.
    ///
    /// Returns false, without recording, when `key` already used all of its
    /// attempts inside the rolling window.
    fn try_acquire(&self, key: &str, now: Instant) -> bool;

    /// Forget every attempt recorded for `key`.
    fn reset(&self, key: &str);
}

/// Sliding-window limiter over a sharded concurrent map.
///
/// Each key's timestamps are updated under that key's shard lock, so two
/// concurrent attempts for the same key cannot both take the last slot.
///
/// Keys whose newest attempt left the window are swept at most once per
/// window, so the map only holds keys active in the last two windows.
pub struct InMemoryLimiter {
    attempts: DashMap<String, Vec<Instant>>,
    max_attempts: usize,
    window: Duration,
    last_sweep: Mutex<Option<Instant>>,
}

impl InMemoryLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts,
            window,
            last_sweep: Mutex::new(None),
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }

    /// Drop every key with no attempt inside the window.
    ///
    /// Must not be called while holding a map entry.
    fn sweep(&self, now: Instant) {
        {
            let Ok(mut last) = self.last_sweep.lock() else {
                return;
            };
            if last.is_some_and(|at| now.saturating_duration_since(at) < self.window) {
                return;
            }
            *last = Some(now);
        }
        let before = self.attempts.len();
        self.attempts.retain(|_, attempts| {
            attempts
                .last()
                .is_some_and(|at| now.saturating_duration_since(*at) < self.window)
        });
        let swept = before.saturating_sub(self.attempts.len());
        if swept > 0 {
            tracing::debug!(swept, "expired attempt windows dropped");
        }
    }
}

impl Default for InMemoryLimiter {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, WINDOW)
    }
}

impl AttemptLimiter for InMemoryLimiter {
    fn try_acquire(&self, key: &str, now: Instant) -> bool {
        self.sweep(now);
        let mut entry = self.attempts.entry(key.to_string()).or_default();
        entry.retain(|at| now.saturating_duration_since(*at) < self.window);
        if entry.len() >= self.max_attempts {
            return false;
        }
        entry.push(now);
        true
    }

    fn reset(&self, key: &str) {
        self.attempts.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixth_attempt_inside_window_is_refused() {
        let limiter = InMemoryLimiter::default();
        let start = Instant::now();
        for i in 0..MAX_ATTEMPTS {
            assert!(limiter.try_acquire("a@x.test", start + Duration::from_secs(i as u64)));
        }
        assert!(!limiter.try_acquire("a@x.test", start + Duration::from_secs(10)));
        // Other keys are unaffected.
        assert!(limiter.try_acquire("b@x.test", start));
    }

    #[test]
    fn window_slides() {
        let limiter = InMemoryLimiter::default();
        let start = Instant::now();
        for _ in 0..MAX_ATTEMPTS {
            assert!(limiter.try_acquire("k", start));
        }
        assert!(!limiter.try_acquire("k", start + WINDOW - Duration::from_secs(1)));
        assert!(limiter.try_acquire("k", start + WINDOW));
    }

    #[test]
    fn reset_clears_the_counter() {
        let limiter = InMemoryLimiter::default();
        let now = Instant::now();
        for _ in 0..MAX_ATTEMPTS {
            limiter.try_acquire("k", now);
        }
        limiter.reset("k");
        assert!(limiter.try_acquire("k", now));
    }

    #[test]
    fn idle_keys_are_dropped_once_their_window_passes() {
        let limiter = InMemoryLimiter::default();
        let start = Instant::now();
        for i in 0..10_000 {
            assert!(limiter.try_acquire(&format!("user{}@x.test", i), start));
        }
        assert_eq!(limiter.tracked_keys(), 10_000);

        assert!(limiter.try_acquire("late@x.test", start + WINDOW * 10));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn sweep_keeps_keys_still_inside_the_window() {
        let limiter = InMemoryLimiter::default();
        let start = Instant::now();
        assert!(limiter.try_acquire("idle", start));
        for _ in 0..MAX_ATTEMPTS {
            assert!(limiter.try_acquire("busy", start + WINDOW));
        }
        assert!(!limiter.try_acquire("busy", start + WINDOW * 2 - Duration::from_secs(1)));
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
