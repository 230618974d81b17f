//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used to deliver runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   VisibilityGate / RetryingLoader ── publish(Event) ──► Bus ──► listener
//!                                                                  │
//!                                                           SubscriberSet::emit
//!                                                      ┌───────────┼──────────┐
//!                                                      ▼           ▼          ▼
//!                                                  LogWriter    Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
