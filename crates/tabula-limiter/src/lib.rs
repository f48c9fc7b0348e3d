// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared rate/concurrency limiter for outbound model and tool calls.
//!
//! One [`RateLimiter`] instance per process gates how many requests may be
//! in flight and how fast they may be issued. It is injected by handle into
//! every coordinator rather than looked up from global state. Counters are
//! atomic and safe under concurrent access; admission is the only cross-run
//! coordination the limiter provides (no sequencing).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tabula_config::LimiterConfig;
use tabula_core::recording;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::debug;

/// Health classification derived from rolling limiter statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterHealth {
    /// Operating normally.
    Healthy,
    /// Block rate above 30%: callers are being turned away.
    Warning,
    /// Every permit is in use right now.
    Busy,
    /// Success rate below 50% over a meaningful sample.
    Error,
}

impl std::fmt::Display for LimiterHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimiterHealth::Healthy => write!(f, "healthy"),
            LimiterHealth::Warning => write!(f, "warning"),
            LimiterHealth::Busy => write!(f, "busy"),
            LimiterHealth::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time snapshot of limiter statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterStats {
    pub attempts: u64,
    pub admitted: u64,
    pub blocked: u64,
    pub successes: u64,
    pub failures: u64,
    pub in_flight: usize,
    /// Blocked / attempts, 0.0 when there were no attempts.
    pub block_rate: f64,
    /// Successes / (successes + failures), 1.0 when nothing completed.
    pub success_rate: f64,
    /// Requests admitted in the last 60 seconds.
    pub requests_per_minute: usize,
}

/// Gates concurrency and pacing of outbound requests.
pub struct RateLimiter {
    semaphore: Semaphore,
    max_concurrent: usize,
    min_interval: Duration,
    /// Earliest instant the next request may be issued. Pacing serializes
    /// through this lock; concurrency does not.
    next_slot: Mutex<Instant>,
    /// Admission timestamps within the rolling one-minute window.
    window: Mutex<VecDeque<Instant>>,
    attempts: AtomicU64,
    admitted: AtomicU64,
    blocked: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Minimum completed requests before the success rate can flip health to error.
const ERROR_SAMPLE_FLOOR: u64 = 10;

impl RateLimiter {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.max_concurrent_requests),
            max_concurrent: config.max_concurrent_requests,
            min_interval: Duration::from_secs_f64(config.min_interval_seconds),
            next_slot: Mutex::new(Instant::now()),
            window: Mutex::new(VecDeque::new()),
            attempts: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    /// Requests admission. Returns `false` when all permits are in use;
    /// otherwise waits out the pacing interval and returns `true`.
    ///
    /// Every `true` must be paired with exactly one [`release`] call.
    ///
    /// [`release`]: RateLimiter::release
    pub async fn acquire(&self) -> bool {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let Ok(permit) = self.semaphore.try_acquire() else {
            self.blocked.fetch_add(1, Ordering::Relaxed);
            recording::record_admission(false);
            debug!(max_concurrent = self.max_concurrent, "limiter rejected request");
            return false;
        };
        // The permit is returned via release(), not by drop.
        permit.forget();

        if !self.min_interval.is_zero() {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            if *slot > now {
                tokio::time::sleep(*slot - now).await;
            }
            *slot = Instant::now() + self.min_interval;
        }

        self.admitted.fetch_add(1, Ordering::Relaxed);
        recording::record_admission(true);

        let mut window = self.window.lock().await;
        let now = Instant::now();
        window.push_back(now);
        while let Some(front) = window.front() {
            if now.duration_since(*front) > Duration::from_secs(60) {
                window.pop_front();
            } else {
                break;
            }
        }

        true
    }

    /// Returns a permit and records the outcome of the completed request.
    pub fn release(&self, success: bool, latency: Duration) {
        self.semaphore.add_permits(1);
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        recording::record_latency(latency.as_secs_f64());
    }

    /// Current number of in-flight requests.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    /// Snapshot of rolling statistics.
    pub async fn stats(&self) -> LimiterStats {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let admitted = self.admitted.load(Ordering::Relaxed);
        let blocked = self.blocked.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);

        let block_rate = if attempts > 0 {
            blocked as f64 / attempts as f64
        } else {
            0.0
        };
        let completed = successes + failures;
        let success_rate = if completed > 0 {
            successes as f64 / completed as f64
        } else {
            1.0
        };

        let now = Instant::now();
        let window = self.window.lock().await;
        let requests_per_minute = window
            .iter()
            .filter(|t| now.duration_since(**t) <= Duration::from_secs(60))
            .count();

        LimiterStats {
            attempts,
            admitted,
            blocked,
            successes,
            failures,
            in_flight: self.in_flight(),
            block_rate,
            success_rate,
            requests_per_minute,
        }
    }

    /// Health classification from current statistics.
    ///
    /// Precedence: error > busy > warning > healthy.
    pub async fn health(&self) -> LimiterHealth {
        let stats = self.stats().await;
        let completed = stats.successes + stats.failures;
        if completed >= ERROR_SAMPLE_FLOOR && stats.success_rate < 0.5 {
            LimiterHealth::Error
        } else if stats.in_flight >= self.max_concurrent {
            LimiterHealth::Busy
        } else if stats.block_rate > 0.3 {
            LimiterHealth::Warning
        } else {
            LimiterHealth::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_concurrent: usize, interval: f64) -> RateLimiter {
        RateLimiter::new(&LimiterConfig {
            max_concurrent_requests: max_concurrent,
            min_interval_seconds: interval,
        })
    }

    #[tokio::test]
    async fn acquire_rejects_beyond_concurrency_cap() {
        let rl = limiter(2, 0.0);
        assert!(rl.acquire().await);
        assert!(rl.acquire().await);
        assert!(!rl.acquire().await);
        assert_eq!(rl.in_flight(), 2);

        rl.release(true, Duration::from_millis(5));
        assert!(rl.acquire().await);
    }

    #[tokio::test]
    async fn release_restores_permit_and_records_outcome() {
        let rl = limiter(1, 0.0);
        assert!(rl.acquire().await);
        rl.release(false, Duration::from_millis(10));
        let stats = rl.stats().await;
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn block_rate_above_threshold_is_warning() {
        let rl = limiter(1, 0.0);
        assert!(rl.acquire().await);
        // Three rejected attempts against one admission: block rate 0.75.
        assert!(!rl.acquire().await);
        assert!(!rl.acquire().await);
        assert!(!rl.acquire().await);
        rl.release(true, Duration::from_millis(1));
        assert_eq!(rl.health().await, LimiterHealth::Warning);
    }

    #[tokio::test]
    async fn all_permits_in_use_is_busy() {
        let rl = limiter(1, 0.0);
        assert!(rl.acquire().await);
        assert_eq!(rl.health().await, LimiterHealth::Busy);
    }

    #[tokio::test]
    async fn low_success_rate_is_error_after_sample_floor() {
        let rl = limiter(4, 0.0);
        for _ in 0..10 {
            assert!(rl.acquire().await);
            rl.release(false, Duration::from_millis(1));
        }
        assert_eq!(rl.health().await, LimiterHealth::Error);
    }

    #[tokio::test]
    async fn fresh_limiter_is_healthy() {
        let rl = limiter(2, 0.0);
        assert_eq!(rl.health().await, LimiterHealth::Healthy);
        let stats = rl.stats().await;
        assert_eq!(stats.block_rate, 0.0);
        assert_eq!(stats.success_rate, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_spaces_out_admissions() {
        let rl = limiter(4, 1.0);
        let start = tokio::time::Instant::now();
        assert!(rl.acquire().await);
        assert!(rl.acquire().await);
        // The second admission must have waited out the interval.
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
