//! Visibility gating.
//!
//! Decides **when** a loadable starts loading: on the first time its region
//! intersects the viewport, or immediately when the host has no detector.
//!
//! ## Contents
//! - [`VisibilityGate`] single-shot trigger with explicit `activate()`/`deactivate()`
//! - [`VisibilityDetector`], [`Observation`], [`IntersectionSink`] host capability seam
//! - [`ImmediateDetector`], [`SignalDetector`] built-in detectors
//! - [`RegionHandle`], [`IntersectionEntry`] data passed across the seam

mod detector;
mod signal;
mod visibility;

pub use detector::{
    ImmediateDetector, IntersectionEntry, Observation, RegionHandle, VisibilityDetector,
};
pub use signal::SignalDetector;
pub use visibility::{FireSource, IntersectionSink, VisibilityGate};
