//! # Visibility detection capability.
//!
//! The gate never talks to a viewport directly. The host injects a
//! [`VisibilityDetector`] that knows how to observe a region and report
//! [`IntersectionEntry`] values through an [`IntersectionSink`]. Each observation
//! is represented by an [`Observation`] the gate disconnects exactly once.
//!
//! Built-in detectors:
//! - [`ImmediateDetector`]: reports "fully visible" as soon as observation starts;
//! - [`SignalDetector`](super::SignalDetector): host-fed, for wiring a real
//!   intersection primitive (and for deterministic tests).
//!
//! A gate built without any detector is pre-fired and never calls into one.

use crate::config::ObserverOptions;
use crate::error::GateError;

use super::visibility::IntersectionSink;

/// Opaque handle of a watched region, supplied by the host rendering layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionHandle(u64);

impl RegionHandle {
    /// Wraps a host-defined region id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the host-defined id.
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RegionHandle {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One intersection report for an observed region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionEntry {
    /// Whether the region overlaps the (margin-extended) viewport.
    pub is_intersecting: bool,
    /// Visible fraction of the region, `0.0..=1.0`.
    pub ratio: f64,
}

impl IntersectionEntry {
    /// Intersecting entry with the given visible fraction.
    pub fn visible(ratio: f64) -> Self {
        Self {
            is_intersecting: true,
            ratio,
        }
    }

    /// Non-intersecting entry.
    pub fn hidden() -> Self {
        Self {
            is_intersecting: false,
            ratio: 0.0,
        }
    }
}

/// A live observation created by a detector.
///
/// The gate calls [`Observation::disconnect`] exactly once: right before firing
/// its callback, or on teardown.
pub trait Observation: Send + 'static {
    /// Stops reporting entries for the observed region.
    fn disconnect(self: Box<Self>);
}

/// Host capability able to watch a region and report intersections.
pub trait VisibilityDetector: Send + Sync + 'static {
    /// Starts observing `region`, reporting entries into `sink`.
    ///
    /// `options` are forwarded verbatim from [`LoadOptions`](crate::LoadOptions).
    /// Implementations may report synchronously from inside this call.
    fn observe(
        &self,
        region: RegionHandle,
        options: &ObserverOptions,
        sink: IntersectionSink,
    ) -> Result<Box<dyn Observation>, GateError>;
}

/// Observation with nothing to release.
struct NoopObservation;

impl Observation for NoopObservation {
    fn disconnect(self: Box<Self>) {}
}

/// Detector that reports the region as fully visible as soon as it is observed.
///
/// Useful when the host has no viewport concept but still wants the
/// `activate()` lifecycle to decide when loading starts.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateDetector;

impl VisibilityDetector for ImmediateDetector {
    fn observe(
        &self,
        _region: RegionHandle,
        _options: &ObserverOptions,
        sink: IntersectionSink,
    ) -> Result<Box<dyn Observation>, GateError> {
        sink.notify(IntersectionEntry::visible(1.0));
        Ok(Box::new(NoopObservation))
    }
}
