//! # LogWriter: tracing-backed event writer
//!
//! A minimal subscriber that renders incoming [`Event`]s as `tracing` records
//! under the `lazygate::events` target. Failures and exhaustion are logged at
//! `warn`, everything else at `debug`.
//!
//! ## Example output
//! ```text
//! [gate-fired] loadable="hero" region=Some(RegionHandle(7)) source="intersection"
//! [starting] loadable="hero" attempt=1
//! [failed] loadable="hero" attempt=1 err="connection reset"
//! [backoff] loadable="hero" delay_ms=1234 after_attempt=1
//! [succeeded] loadable="hero" attempt=2
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

const TARGET: &str = "lazygate::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let name = e.loadable.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::GateActivated => {
                tracing::debug!(target: TARGET, "[gate-activated] loadable={name:?} region={:?}", e.region);
            }
            EventKind::GateFired => {
                tracing::debug!(target: TARGET, "[gate-fired] loadable={name:?} region={:?} source={reason:?}", e.region);
            }
            EventKind::GateReleased => {
                tracing::debug!(target: TARGET, "[gate-released] loadable={name:?} region={:?}", e.region);
            }
            EventKind::AttemptStarting => {
                tracing::debug!(target: TARGET, "[starting] loadable={name:?} attempt={:?}", e.attempt);
            }
            EventKind::AttemptFailed => {
                tracing::warn!(target: TARGET, "[failed] loadable={name:?} attempt={:?} err={reason:?}", e.attempt);
            }
            EventKind::BackoffScheduled => {
                tracing::debug!(
                    target: TARGET,
                    "[backoff] loadable={name:?} delay_ms={:?} after_attempt={:?}",
                    e.delay_ms,
                    e.attempt
                );
            }
            EventKind::LoadSucceeded => {
                tracing::debug!(target: TARGET, "[succeeded] loadable={name:?} attempt={:?}", e.attempt);
            }
            EventKind::RetriesExhausted => {
                tracing::warn!(target: TARGET, "[exhausted] loadable={name:?} attempts={:?} err={reason:?}", e.attempt);
            }
            EventKind::TimeoutHit => {
                tracing::warn!(target: TARGET, "[timeout] loadable={name:?} timeout_ms={:?}", e.timeout_ms);
            }
            EventKind::Abandoned => {
                tracing::debug!(target: TARGET, "[abandoned] loadable={name:?} attempt={:?}", e.attempt);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handles_every_kind() {
        let writer = LogWriter::new();
        for kind in [
            EventKind::GateActivated,
            EventKind::GateFired,
            EventKind::GateReleased,
            EventKind::AttemptStarting,
            EventKind::AttemptFailed,
            EventKind::BackoffScheduled,
            EventKind::LoadSucceeded,
            EventKind::RetriesExhausted,
            EventKind::TimeoutHit,
            EventKind::Abandoned,
        ] {
            writer.on_event(&Event::new(kind).with_loadable("demo")).await;
        }
        assert_eq!(writer.name(), "LogWriter");
    }
}
