//! # Load options.
//!
//! Provides [`LoadOptions`], the settings of one lazy loadable, and
//! [`ObserverOptions`], the pass-through settings for the visibility detector.
//!
//! Options are validated once, when the loadable is built, so that a bad
//! configuration fails before any attempt is made.
//!
//! ## Defaults
//! - `max_retries = 3` → up to 4 producer invocations
//! - `retry_delay = 1000ms`
//! - `max_delay = None` (unbounded exponential growth)
//! - `timeout = Some(30s)` (`None` = wait forever)

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::{BackoffPolicy, JitterPolicy};

/// Settings forwarded verbatim to the [`VisibilityDetector`](crate::VisibilityDetector).
///
/// The gate also reads [`ObserverOptions::trigger_ratio`] to decide when an
/// intersection entry counts as "visible".
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverOptions {
    /// Margin grown around the viewport before intersecting (detector-defined syntax, e.g. `"200px"`).
    pub root_margin: String,
    /// Visible fractions of the region at which the detector reports, each in `[0, 1]`.
    pub thresholds: Vec<f64>,
}

impl Default for ObserverOptions {
    /// `root_margin = "0px"`, `thresholds = [0.0]` (any overlap counts).
    fn default() -> Self {
        Self {
            root_margin: "0px".to_string(),
            thresholds: vec![0.0],
        }
    }
}

impl ObserverOptions {
    /// Sets the root margin.
    pub fn with_root_margin(mut self, margin: impl Into<String>) -> Self {
        self.root_margin = margin.into();
        self
    }

    /// Sets a single threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.thresholds = vec![threshold];
        self
    }

    /// Smallest configured threshold; an entry at or above it counts as visible.
    pub fn trigger_ratio(&self) -> f64 {
        self.thresholds
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
            .min(1.0)
            .max(0.0)
    }

    /// Checks thresholds are present and within `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds.is_empty() {
            return Err(ConfigError::NoThresholds);
        }
        match self
            .thresholds
            .iter()
            .find(|t| !(0.0..=1.0).contains(*t))
        {
            Some(bad) => Err(ConfigError::InvalidThreshold(*bad)),
            None => Ok(()),
        }
    }
}

/// Configuration of a single lazy loadable.
///
/// ## Field semantics
/// - `max_retries`: retries after the first attempt (`0` = one attempt only)
/// - `retry_delay`: base backoff delay, must be `> 0`
/// - `max_delay`: optional cap on a single backoff delay, must be `> 0` when set
/// - `timeout`: overall budget measured from creation, `None` = no timeout
/// - `observer_options`: forwarded to the visibility detector
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Retries allowed after the first failed attempt.
    pub max_retries: u32,
    /// Base delay before the first retry; doubles per failure.
    pub retry_delay: Duration,
    /// Optional cap on any single backoff delay.
    pub max_delay: Option<Duration>,
    /// Overall timeout owned by the consumer side.
    pub timeout: Option<Duration>,
    /// Pass-through detector settings.
    pub observer_options: ObserverOptions,
    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            max_delay: None,
            timeout: Some(Duration::from_secs(30)),
            observer_options: ObserverOptions::default(),
            bus_capacity: 1024,
        }
    }
}

impl LoadOptions {
    /// Returns new options with `max_retries` set.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns new options with `retry_delay` set.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Returns new options with `max_delay` set.
    pub fn with_max_delay(mut self, max_delay: Option<Duration>) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Returns new options with `timeout` set (`None` = infinite).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns new options with detector settings replaced.
    pub fn with_observer_options(mut self, observer_options: ObserverOptions) -> Self {
        self.observer_options = observer_options;
        self
    }

    /// Rejects options that cannot drive a load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_delay.is_zero() {
            return Err(ConfigError::ZeroRetryDelay);
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_delay.is_some_and(|m| m.is_zero()) {
            return Err(ConfigError::ZeroMaxDelay);
        }
        self.observer_options.validate()
    }

    /// Backoff policy derived from `retry_delay` and `max_delay`.
    #[inline]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            first: self.retry_delay,
            factor: 2.0,
            max: self.max_delay,
            jitter: JitterPolicy::default(),
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = LoadOptions::default();
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.retry_delay, Duration::from_millis(1000));
        assert_eq!(opts.timeout, Some(Duration::from_secs(30)));
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_delay_and_timeout() {
        let opts = LoadOptions::default().with_retry_delay(Duration::ZERO);
        assert_eq!(opts.validate(), Err(ConfigError::ZeroRetryDelay));

        let opts = LoadOptions::default().with_timeout(Some(Duration::ZERO));
        assert_eq!(opts.validate(), Err(ConfigError::ZeroTimeout));

        let opts = LoadOptions::default().with_max_delay(Some(Duration::ZERO));
        assert_eq!(opts.validate(), Err(ConfigError::ZeroMaxDelay));
    }

    #[test]
    fn test_infinite_timeout_is_valid() {
        let opts = LoadOptions::default().with_timeout(None);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_threshold_validation() {
        let bad = ObserverOptions::default().with_threshold(1.5);
        assert_eq!(bad.validate(), Err(ConfigError::InvalidThreshold(1.5)));

        let nan = ObserverOptions::default().with_threshold(f64::NAN);
        assert!(matches!(nan.validate(), Err(ConfigError::InvalidThreshold(_))));

        let empty = ObserverOptions {
            thresholds: Vec::new(),
            ..ObserverOptions::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::NoThresholds));
    }

    #[test]
    fn test_trigger_ratio_is_smallest_threshold() {
        let opts = ObserverOptions {
            thresholds: vec![0.75, 0.25, 0.5],
            ..ObserverOptions::default()
        };
        assert_eq!(opts.trigger_ratio(), 0.25);
    }

    #[test]
    fn test_backoff_follows_options() {
        let opts = LoadOptions::default()
            .with_retry_delay(Duration::from_millis(250))
            .with_max_delay(Some(Duration::from_secs(2)));
        let backoff = opts.backoff();
        assert_eq!(backoff.first, Duration::from_millis(250));
        assert_eq!(backoff.max, Some(Duration::from_secs(2)));
        assert_eq!(backoff.factor, 2.0);
    }
}
