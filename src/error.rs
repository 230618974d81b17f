//! Error types used by the loader, the visibility gate and the resolve slot.
//!
//! - [`LoadError`]: outcomes and failures of a lazy load, as seen by the consumer.
//! - [`ConfigError`]: invalid [`LoadOptions`](crate::LoadOptions) or host environment.
//! - [`GateError`]: misuse of a [`VisibilityGate`](crate::VisibilityGate) or detector failure.
//! - [`SlotError`]: single-assignment violations on a [`ResolveSlot`](crate::ResolveSlot).
//!
//! All enums provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by producers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced while loading a deferred value.
///
/// [`LoadError::Transient`] is absorbed by the retry loop and only shows up in
/// events and logs; every other variant is terminal for the consumer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoadError {
    /// One attempt failed while retry budget remains.
    #[error("attempt {attempt} failed: {error}")]
    Transient {
        /// 1-based attempt number that failed.
        attempt: u32,
        /// Error returned by the producer.
        #[source]
        error: BoxError,
    },

    /// The producer kept failing after the whole retry budget was spent.
    #[error("retries exhausted, attempts={attempts}: {last_error}")]
    RetriesExhausted {
        /// Total number of producer invocations.
        attempts: u32,
        /// Error returned by the final attempt.
        #[source]
        last_error: BoxError,
    },

    /// No terminal outcome was reached within the configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Options or host environment were rejected before any attempt.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The visibility gate could not start observing.
    #[error("visibility gate: {0}")]
    Gate(#[from] GateError),

    /// The loader went away without resolving (torn down before it became visible).
    #[error("loader abandoned before resolving")]
    Abandoned,
}

impl LoadError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use lazygate::LoadError;
    /// use std::time::Duration;
    ///
    /// let err = LoadError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "load_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::Transient { .. } => "load_transient",
            LoadError::RetriesExhausted { .. } => "load_retries_exhausted",
            LoadError::Timeout { .. } => "load_timeout",
            LoadError::Config(_) => "load_config",
            LoadError::Gate(_) => "load_gate",
            LoadError::Abandoned => "load_abandoned",
        }
    }

    /// Number of attempts made, when known.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            LoadError::Transient { attempt, .. } => Some(*attempt),
            LoadError::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Turns the failure of the last allowed attempt into
    /// [`LoadError::RetriesExhausted`]. Other variants are returned unchanged.
    pub fn into_exhausted(self) -> LoadError {
        match self {
            LoadError::Transient { attempt, error } => LoadError::RetriesExhausted {
                attempts: attempt,
                last_error: error,
            },
            other => other,
        }
    }

    /// Whether this error ends the load (everything but [`LoadError::Transient`]).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadError::Transient { .. })
    }
}

/// # Rejected configuration or host environment.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("retry delay must be greater than zero")]
    ZeroRetryDelay,

    /// Use `timeout: None` for "no timeout".
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("max delay must be greater than zero")]
    ZeroMaxDelay,

    #[error("at least one intersection threshold is required")]
    NoThresholds,

    #[error("intersection threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    /// Loadables spawn their driver on the ambient tokio runtime.
    #[error("no tokio runtime available in the host environment")]
    NoRuntime,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroRetryDelay => "config_zero_retry_delay",
            ConfigError::ZeroTimeout => "config_zero_timeout",
            ConfigError::ZeroMaxDelay => "config_zero_max_delay",
            ConfigError::NoThresholds => "config_no_thresholds",
            ConfigError::InvalidThreshold(_) => "config_invalid_threshold",
            ConfigError::NoRuntime => "config_no_runtime",
        }
    }
}

/// # Visibility gate failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// A gate accepts exactly one "became visible" callback.
    #[error("a became-visible callback is already registered")]
    CallbackAlreadySet,

    /// The detector refused to observe the region.
    #[error("detector failed: {reason}")]
    Detector {
        /// Detector-supplied explanation.
        reason: String,
    },
}

impl GateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GateError::CallbackAlreadySet => "gate_callback_already_set",
            GateError::Detector { .. } => "gate_detector",
        }
    }
}

/// # Single-assignment violations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// The slot was already written; the new value was discarded.
    #[error("slot already resolved")]
    AlreadyResolved,

    /// The consumer dropped its receiver; the value was discarded.
    #[error("consumer abandoned the slot")]
    Abandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_carries_source_and_attempts() {
        let err = LoadError::RetriesExhausted {
            attempts: 4,
            last_error: "boom".into(),
        };
        assert_eq!(err.attempts(), Some(4));
        assert!(err.is_terminal());
        assert_eq!(err.to_string(), "retries exhausted, attempts=4: boom");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn test_transient_is_not_terminal() {
        let err = LoadError::Transient {
            attempt: 2,
            error: "flaky".into(),
        };
        assert!(!err.is_terminal());
        assert_eq!(err.to_string(), "attempt 2 failed: flaky");
        assert_eq!(err.as_label(), "load_transient");
    }

    #[test]
    fn test_config_error_converts() {
        let err: LoadError = ConfigError::ZeroRetryDelay.into();
        assert_eq!(err.as_label(), "load_config");
        assert!(matches!(err, LoadError::Config(ConfigError::ZeroRetryDelay)));
    }

    #[test]
    fn test_transient_becomes_exhausted() {
        let err = LoadError::Transient {
            attempt: 3,
            error: "still down".into(),
        }
        .into_exhausted();
        assert_eq!(err.as_label(), "load_retries_exhausted");
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.to_string(), "retries exhausted, attempts=3: still down");

        let timeout = LoadError::Timeout {
            timeout: std::time::Duration::from_secs(1),
        };
        assert_eq!(timeout.into_exhausted().as_label(), "load_timeout");
    }
}
