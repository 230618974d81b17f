//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the visibility gate, the retrying
//! loader and the loadable handle.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `VisibilityGate`, `RetryingLoader`, `LoadableHandle` (timeouts).
//! - **Consumers**: the loadable's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained through `LoadableHandle::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
