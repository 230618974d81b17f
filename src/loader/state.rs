//! # Loader state.
//!
//! ```text
//!   Idle ──► Attempting ──► Succeeded
//!               │  ▲
//!       failure │  │ delay elapsed
//!               ▼  │
//!          AwaitingRetry
//!               │
//!               └─ attempts > max_retries ──► Failed
//! ```
//!
//! `Succeeded` and `Failed` are terminal.

use std::time::Duration;

/// Observable state of a loader, published through a `tokio::sync::watch` channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Waiting for the gate to fire.
    #[default]
    Idle,
    /// Producer invocation `attempt` (1-based) is running.
    Attempting { attempt: u32 },
    /// Attempt `attempt` failed; the next one starts after `delay`.
    AwaitingRetry { attempt: u32, delay: Duration },
    /// The value was delivered after `attempts` invocations.
    Succeeded { attempts: u32 },
    /// Every allowed attempt failed.
    Failed { attempts: u32 },
}

impl LoadState {
    /// `Succeeded` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Succeeded { .. } | LoadState::Failed { .. })
    }

    /// States during which the host shows its placeholder.
    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }

    /// Producer invocations started so far.
    pub fn attempts(&self) -> u32 {
        match *self {
            LoadState::Idle => 0,
            LoadState::Attempting { attempt } | LoadState::AwaitingRetry { attempt, .. } => attempt,
            LoadState::Succeeded { attempts } | LoadState::Failed { attempts } => attempts,
        }
    }
}
