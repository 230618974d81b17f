//! Retry policies.
//!
//! This module groups the knobs that control **how long** to wait between
//! load attempts.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / optional max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries
//!
//! ## Quick wiring
//! ```text
//! LoadOptions { retry_delay, max_delay, .. }
//!      └─► LoadOptions::backoff() ─► BackoffPolicy
//!           └─► loader::RetryingLoader uses backoff.next(failures) between attempts
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=1000ms, factor=2.0, max=None, jitter=Upward(0.5).

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
