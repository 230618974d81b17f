//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that many loadables
//! failing at the same moment do not retry in lockstep.
//!
//! - [`JitterPolicy::None`]: no randomization, predictable delays
//! - [`JitterPolicy::Upward`]: delay × (1 + U[0,1) × spread), never shorter than the base

use rand::Rng;
use std::time::Duration;

/// Default upward spread: up to 50% added on top of the base delay.
pub const DEFAULT_SPREAD: f64 = 0.5;

/// Policy controlling randomization of retry delays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JitterPolicy {
    /// No jitter: use exact backoff delay.
    None,

    /// Positive jitter: `delay × (1 + U[0,1) × spread)`.
    ///
    /// Result lies in `[delay, delay × (1 + spread))`.
    Upward {
        /// Maximum added fraction of the base delay (`0.5` = up to +50%).
        spread: f64,
    },
}

impl Default for JitterPolicy {
    /// Returns `Upward { spread: 0.5 }`.
    fn default() -> Self {
        JitterPolicy::Upward {
            spread: DEFAULT_SPREAD,
        }
    }
}

impl JitterPolicy {
    /// Applies jitter to the given delay with a fresh uniform draw.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Upward { .. } => {
                let draw: f64 = rand::rng().random();
                self.apply_with(delay, draw)
            }
        }
    }

    /// Applies jitter using an explicit draw from `[0, 1)`.
    ///
    /// Draws outside that range are clamped into it. The result is kept strictly
    /// below the exclusive upper bound even when float rounding would reach it.
    pub fn apply_with(&self, delay: Duration, draw: f64) -> Duration {
        let spread = match self {
            JitterPolicy::None => return delay,
            JitterPolicy::Upward { spread } if *spread > 0.0 && spread.is_finite() => *spread,
            JitterPolicy::Upward { .. } => return delay,
        };
        if delay.is_zero() {
            return delay;
        }

        let draw = if draw.is_nan() { 0.0 } else { draw.clamp(0.0, 1.0) };
        let base = delay.as_secs_f64();
        let jittered = Duration::try_from_secs_f64(base * (1.0 + draw * spread))
            .unwrap_or(Duration::MAX)
            .max(delay);
        let upper = Duration::try_from_secs_f64(base * (1.0 + spread)).unwrap_or(Duration::MAX);

        if upper > delay && jittered >= upper {
            upper - Duration::from_nanos(1)
        } else {
            jittered
        }
    }
}
