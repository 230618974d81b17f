//! # lazygate
//!
//! **Lazygate** defers an async load until a region becomes visible, then runs
//! it with bounded, jittered exponential retries.
//!
//! The viewport primitive and the rendering layer stay outside the crate: the
//! host injects a [`VisibilityDetector`] and renders through a [`Presenter`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌────────────────────┐        ┌──────────────────────┐
//!     │ VisibilityDetector │        │   Producer (async)   │
//!     │   (host, injected) │        │  () -> Result<T, E>  │
//!     └─────────┬──────────┘        └──────────┬───────────┘
//!               │ IntersectionSink             │
//!               ▼                              ▼
//!     ┌────────────────────┐ fires  ┌──────────────────────┐
//!     │   VisibilityGate   ├───────►│    RetryingLoader    │
//!     │ (single-shot, Weak │ once   │ (attempt / backoff / │
//!     │  sink, teardown)   │        │  terminal failure)   │
//!     └─────────┬──────────┘        └───┬──────────────┬───┘
//!               │                       │              │
//!               │ Publishes             │ writes once  │ Publishes
//!               │ - GateActivated       ▼              │ - AttemptStarting
//!               │ - GateFired      ResolveSlot         │ - AttemptFailed
//!               │ - GateReleased        │              │ - BackoffScheduled
//!               ▼                       ▼              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                 (capacity: LoadOptions::bus_capacity)             │
//! └───────────────┬─────────────────────────────────┬─────────────────┘
//!                 ▼                                 ▼
//!        LoadableHandle::subscribe          SubscriberSet (per-sub queues)
//!                                           ┌─────────┼─────────┐
//!                                           ▼         ▼         ▼
//!                                        worker1   worker2   workerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! create_lazy_loadable ──► activate() ──► detector.observe(region)
//!
//! entry crosses threshold (or no detector, or preload())
//!   ├─► disconnect observation
//!   └─► RetryingLoader::run()
//!
//! loop {
//!   ├─► attempt += 1, publish AttemptStarting
//!   ├─► producer.produce().await
//!   │       ├─ Ok  ──► resolve slot, publish LoadSucceeded, exit
//!   │       └─ Err ──► publish AttemptFailed
//!   │                  ├─ attempt > max_retries ─► RetriesExhausted, exit
//!   │                  └─ delay = base * 2^(attempt-1) * (1 + U[0,1) * 0.5)
//!   │                       ├─ publish BackoffScheduled{ delay, attempt }
//!   │                       └─ sleep(delay) (consumer abandonment / teardown wakes it)
//!   └─ exit early: consumer dropped or timed out, teardown ─► Abandoned
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                                 |
//! |-------------------|--------------------------------------------------------------------|----------------------------------------------------|
//! | **Loadables**     | One-call entry point, consumer handle and host lifecycle controls. | [`create_lazy_loadable`], [`LoadableHandle`]       |
//! | **Gate**          | Single-shot visibility trigger over an injected detector.          | [`VisibilityGate`], [`VisibilityDetector`]         |
//! | **Loader**        | Producers, state machine and single-assignment outcome slot.       | [`Producer`], [`LoadState`], [`ResolveSlot`]       |
//! | **Policies**      | Exponential backoff with upward jitter.                            | [`BackoffPolicy`], [`JitterPolicy`]                |
//! | **Subscriber API**| Hook into gate and loader events (logging, metrics, custom).       | [`Subscribe`], [`Event`]                           |
//! | **Errors**        | Typed errors with stable labels.                                   | [`LoadError`], [`ConfigError`], [`GateError`]      |
//! | **Configuration** | Retry budget, delays, timeout and detector options.                | [`LoadOptions`], [`ObserverOptions`]               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber backed by `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lazygate::{
//!     BoxError, IntersectionEntry, LoadOptions, LoadableHandle, ProducerFn, ProducerRef,
//!     RegionHandle, SignalDetector, VisibilityDetector,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let detector = SignalDetector::new();
//!     let region = RegionHandle::new(42);
//!
//!     let producer: ProducerRef<String> = ProducerFn::arc(|| async {
//!         Ok::<_, BoxError>("image bytes".to_string())
//!     });
//!
//!     let shared: Arc<dyn VisibilityDetector> = Arc::new(detector.clone());
//!     let handle = LoadableHandle::builder(producer, region)
//!         .with_name("hero-image")
//!         .with_options(LoadOptions::default().with_retry_delay(Duration::from_millis(250)))
//!         .with_detector(Some(shared))
//!         .build()?;
//!
//!     // host mount
//!     handle.activate()?;
//!
//!     // the host's viewport primitive reports the region
//!     detector.push(region, IntersectionEntry::visible(0.5));
//!
//!     assert_eq!(handle.outcome().await?, "image bytes");
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod gate;
mod loadable;
mod loader;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use config::{LoadOptions, ObserverOptions};
pub use error::{BoxError, ConfigError, GateError, LoadError, SlotError};
pub use events::{Event, EventKind};
pub use gate::{
    FireSource, ImmediateDetector, IntersectionEntry, IntersectionSink, Observation, RegionHandle,
    SignalDetector, VisibilityDetector, VisibilityGate,
};
pub use loadable::{
    LoadableBuilder, LoadableControls, LoadableHandle, Presenter, create_lazy_loadable,
};
pub use loader::{
    BoxProduceFuture, LoadState, LoadTask, Outcome, Producer, ProducerFn, ProducerRef, ResolveSlot,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
