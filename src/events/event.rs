//! # Runtime events emitted by gates and loaders.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Gate events**: observation lifecycle (activated, fired, released)
//! - **Attempt events**: loader execution flow (starting, failed, backoff)
//! - **Terminal events**: final outcome (succeeded, exhausted, timeout, abandoned)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, loadable
//! name, region, attempt numbers and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use lazygate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_loadable("hero-image")
//!     .with_reason("connection reset")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(2400));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.loadable.as_deref(), Some("hero-image"));
//! assert_eq!(ev.delay_ms, Some(2400));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::gate::RegionHandle;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Gate events ===
    /// The gate started observing its region.
    ///
    /// Sets:
    /// - `loadable`, `region`
    GateActivated,

    /// The region became visible (or the gate was pre-fired / forced); the loader starts.
    ///
    /// Sets:
    /// - `loadable`, `region`
    /// - `reason`: `"intersection"`, `"no-detector"` or `"forced"`
    GateFired,

    /// The gate was torn down before firing; no attempt will ever start.
    ///
    /// Sets:
    /// - `loadable`, `region`
    GateReleased,

    // === Attempt events ===
    /// Producer invocation is starting.
    ///
    /// Sets:
    /// - `loadable`
    /// - `attempt`: attempt number (1-based)
    AttemptStarting,

    /// Producer invocation failed; retry budget remains.
    ///
    /// Sets:
    /// - `loadable`, `attempt`
    /// - `reason`: failure message
    AttemptFailed,

    /// Next attempt scheduled after a failure.
    ///
    /// Sets:
    /// - `loadable`
    /// - `attempt`: the attempt that failed
    /// - `delay_ms`: delay before the next attempt
    /// - `reason`: last failure message
    BackoffScheduled,

    // === Terminal events ===
    /// Producer succeeded and the value was handed to the consumer.
    ///
    /// Sets:
    /// - `loadable`, `attempt`
    LoadSucceeded,

    /// Retry budget spent; the consumer receives the last error.
    ///
    /// Sets:
    /// - `loadable`
    /// - `attempt`: total attempts made
    /// - `reason`: last failure message
    RetriesExhausted,

    /// The consumer's timeout elapsed before a terminal outcome.
    ///
    /// Sets:
    /// - `loadable`
    /// - `timeout_ms`
    TimeoutHit,

    /// The consumer went away; the loader stopped without delivering.
    ///
    /// Sets:
    /// - `loadable`
    /// - `attempt`: last attempt number, if any ran
    Abandoned,
}

impl EventKind {
    /// Whether no further events follow for the same loadable.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::LoadSucceeded
                | EventKind::RetriesExhausted
                | EventKind::Abandoned
                | EventKind::GateReleased
        )
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the loadable, if applicable.
    pub loadable: Option<Arc<str>>,
    /// Watched region, for gate events.
    pub region: Option<RegionHandle>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before next attempt in milliseconds.
    pub delay_ms: Option<u64>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, fire source).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            loadable: None,
            region: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a loadable name.
    #[inline]
    pub fn with_loadable(mut self, name: impl Into<Arc<str>>) -> Self {
        self.loadable = Some(name.into());
        self
    }

    /// Attaches a region handle.
    #[inline]
    pub fn with_region(mut self, region: RegionHandle) -> Self {
        self.region = Some(region);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds, saturating).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::AttemptStarting);
        let b = Event::new(EventKind::AttemptFailed);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::MAX);
        assert_eq!(ev.delay_ms, Some(u64::MAX));
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(EventKind::LoadSucceeded.is_terminal());
        assert!(EventKind::RetriesExhausted.is_terminal());
        assert!(!EventKind::BackoffScheduled.is_terminal());
        assert!(!EventKind::TimeoutHit.is_terminal());
    }
}
