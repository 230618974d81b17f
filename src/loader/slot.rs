//! # Single-assignment resolve slot.
//!
//! [`ResolveSlot`] is the writer half of a one-shot channel that accepts
//! **exactly one** write. The consumer holds the matching
//! [`tokio::sync::oneshot::Receiver`].
//!
//! ```text
//!   ResolveSlot::channel()
//!        ├─► ResolveSlot      (loader)    resolve(outcome) ── once ──┐
//!        └─► oneshot::Receiver (consumer) ◄─────────────────────────┘
//! ```
//!
//! ## Rules
//! - A second `resolve` returns [`SlotError::AlreadyResolved`]; the first value stays.
//! - If the consumer dropped its receiver, `resolve` returns
//!   [`SlotError::Abandoned`] and the value is discarded.
//! - [`ResolveSlot::abandoned`] lets the writer wait for the consumer to leave.

use std::future;

use tokio::sync::oneshot;

use crate::error::{LoadError, SlotError};

/// Outcome delivered through a slot.
pub type Outcome<T> = Result<T, LoadError>;

enum SlotState<T> {
    Open(oneshot::Sender<Outcome<T>>),
    Resolved,
    Abandoned,
}

/// Writer half of a single-assignment outcome channel.
pub struct ResolveSlot<T> {
    state: SlotState<T>,
}

impl<T> ResolveSlot<T> {
    /// Creates a slot and the consumer's receiver.
    pub fn channel() -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                state: SlotState::Open(tx),
            },
            rx,
        )
    }

    /// Writes the outcome. Succeeds at most once.
    pub fn resolve(&mut self, outcome: Outcome<T>) -> Result<(), SlotError> {
        match std::mem::replace(&mut self.state, SlotState::Resolved) {
            SlotState::Open(tx) => tx.send(outcome).map_err(|_| {
                self.state = SlotState::Abandoned;
                SlotError::Abandoned
            }),
            SlotState::Resolved => Err(SlotError::AlreadyResolved),
            SlotState::Abandoned => {
                self.state = SlotState::Abandoned;
                Err(SlotError::Abandoned)
            }
        }
    }

    /// Whether a value was delivered.
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, SlotState::Resolved)
    }

    /// Whether the consumer is gone (receiver dropped).
    pub fn is_abandoned(&self) -> bool {
        match &self.state {
            SlotState::Open(tx) => tx.is_closed(),
            SlotState::Resolved => false,
            SlotState::Abandoned => true,
        }
    }

    /// Completes when the consumer drops its receiver.
    ///
    /// Never completes once the slot is resolved.
    pub async fn abandoned(&mut self) {
        match &mut self.state {
            SlotState::Open(tx) => tx.closed().await,
            SlotState::Resolved => future::pending::<()>().await,
            SlotState::Abandoned => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_write_wins() {
        let (mut slot, rx) = ResolveSlot::<u32>::channel();
        assert!(slot.resolve(Ok(1)).is_ok());
        assert!(slot.is_resolved());
        assert_eq!(slot.resolve(Ok(2)), Err(SlotError::AlreadyResolved));
        assert_eq!(slot.resolve(Err(LoadError::Abandoned)), Err(SlotError::AlreadyResolved));
        assert_eq!(rx.await.expect("value").expect("ok"), 1);
    }

    #[tokio::test]
    async fn test_write_after_consumer_left_is_refused() {
        let (mut slot, rx) = ResolveSlot::<u32>::channel();
        drop(rx);
        assert!(slot.is_abandoned());
        slot.abandoned().await;
        assert_eq!(slot.resolve(Ok(7)), Err(SlotError::Abandoned));
        assert_eq!(slot.resolve(Ok(8)), Err(SlotError::Abandoned));
        assert!(!slot.is_resolved());
    }

    #[tokio::test]
    async fn test_dropped_slot_closes_receiver() {
        let (slot, rx) = ResolveSlot::<u32>::channel();
        drop(slot);
        assert!(rx.await.is_err());
    }
}
