//! # Backoff policy for retrying loads.
//!
//! [`BackoffPolicy`] controls how retry delays grow after repeated failures.
//! It is parameterized by:
//! - [`BackoffPolicy::first`] the delay after the first failure;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] an optional cap (uncapped by default);
//! - [`BackoffPolicy::jitter`] randomization applied to each delay.
//!
//! The delay after failure `k` (1-based) is `first × factor^(k-1)`, then jitter,
//! then the optional cap. With the defaults this is
//! `first × 2^(k-1) × (1 + U[0,1) × 0.5)`.
//!
//! Growth is unbounded unless `max` is set; large retry counts produce very long
//! waits. Values too large for a [`Duration`] saturate at [`Duration::MAX`].
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use lazygate::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(1000),
//!     factor: 2.0,
//!     max: None,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(1), Duration::from_millis(1000));
//! assert_eq!(backoff.next(2), Duration::from_millis(2000));
//! assert_eq!(backoff.next(4), Duration::from_millis(8000));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Multiplicative growth factor per failure.
    pub factor: f64,
    /// Optional delay cap (`None` = unbounded growth).
    pub max: Option<Duration>,
    /// Jitter policy applied to every delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a strategy with:
    /// - `first = 1000ms`;
    /// - `factor = 2.0`;
    /// - `max = None`;
    /// - `jitter = Upward { spread: 0.5 }`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(1000),
            factor: 2.0,
            max: None,
            jitter: JitterPolicy::default(),
        }
    }
}

impl BackoffPolicy {
    /// Un-jittered delay after `failures` failed attempts (1-based).
    ///
    /// `failures = 0` is treated as the first failure.
    pub fn base(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if !secs.is_finite() || secs < 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Computes the delay after `failures` failed attempts with a fresh jitter draw.
    pub fn next(&self, failures: u32) -> Duration {
        self.cap(self.jitter.apply(self.base(failures)))
    }

    /// Computes the delay using an explicit jitter draw from `[0, 1)`.
    pub fn next_with(&self, failures: u32, draw: f64) -> Duration {
        self.cap(self.jitter.apply_with(self.base(failures), draw))
    }

    /// Exclusive-upper window `[low, high)` the jittered delay for `failures` falls in.
    pub fn window(&self, failures: u32) -> (Duration, Duration) {
        let low = self.base(failures);
        let high = match self.jitter {
            JitterPolicy::None => low,
            JitterPolicy::Upward { spread } => {
                Duration::try_from_secs_f64(low.as_secs_f64() * (1.0 + spread.max(0.0)))
                    .unwrap_or(Duration::MAX)
            }
        };
        (self.cap(low), self.cap(high))
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}
