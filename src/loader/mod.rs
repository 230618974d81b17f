//! Deferred loading with bounded retries.
//!
//! ## Contents
//! - [`Producer`], [`ProducerFn`] the unit of deferred work
//! - [`LoadTask`] producer plus retry budget and backoff
//! - [`ResolveSlot`] single-assignment outcome channel
//! - [`LoadState`] observable loader state
//!
//! The retry loop itself (`RetryingLoader`) is crate-internal; loadables
//! spawn it once their visibility gate fires.

mod producer;
mod retry;
mod slot;
mod state;

pub use producer::{BoxProduceFuture, Producer, ProducerFn, ProducerRef};
pub(crate) use retry::RetryingLoader;
pub use retry::LoadTask;
pub use slot::{Outcome, ResolveSlot};
pub use state::LoadState;
