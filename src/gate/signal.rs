//! # Host-fed visibility detector.
//!
//! [`SignalDetector`] keeps one sink per observed region. The host's real
//! intersection primitive (a platform callback, a scroll handler, a test) pushes
//! [`IntersectionEntry`] values with [`SignalDetector::push`]; the detector routes
//! them to the gate watching that region.
//!
//! ```text
//! host viewport ── push(region, entry) ──► SignalDetector ──► IntersectionSink ──► VisibilityGate
//! ```
//!
//! Entries for regions nobody observes are dropped. A region can be observed by
//! one gate at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::config::ObserverOptions;
use crate::error::GateError;

use super::detector::{IntersectionEntry, Observation, RegionHandle, VisibilityDetector};
use super::visibility::IntersectionSink;

struct Watch {
    id: u64,
    sink: IntersectionSink,
    options: ObserverOptions,
}

#[derive(Default)]
struct Watches {
    next_id: u64,
    by_region: HashMap<RegionHandle, Watch>,
}

/// Detector driven by intersection entries pushed from the host.
#[derive(Clone, Default)]
pub struct SignalDetector {
    inner: Arc<Mutex<Watches>>,
}

impl SignalDetector {
    /// Creates a detector with no observations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `entry` to the gate observing `region`.
    ///
    /// Returns `false` when no live observation exists for the region.
    pub fn push(&self, region: RegionHandle, entry: IntersectionEntry) -> bool {
        // The gate may disconnect from inside `notify`; the lock must not be held.
        let sink = self.lock().by_region.get(&region).map(|w| w.sink.clone());

        match sink {
            Some(sink) => sink.notify(entry),
            None => false,
        }
    }

    /// Whether `region` currently has a live observation.
    pub fn is_observing(&self, region: RegionHandle) -> bool {
        self.lock().by_region.contains_key(&region)
    }

    /// Number of live observations.
    pub fn observed_count(&self) -> usize {
        self.lock().by_region.len()
    }

    /// Options the gate forwarded when it started observing `region`.
    pub fn options_for(&self, region: RegionHandle) -> Option<ObserverOptions> {
        self.lock().by_region.get(&region).map(|w| w.options.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Watches> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VisibilityDetector for SignalDetector {
    fn observe(
        &self,
        region: RegionHandle,
        options: &ObserverOptions,
        sink: IntersectionSink,
    ) -> Result<Box<dyn Observation>, GateError> {
        let mut watches = self.lock();
        if watches.by_region.contains_key(&region) {
            return Err(GateError::Detector {
                reason: format!("region {} is already observed", region.id()),
            });
        }

        watches.next_id += 1;
        let id = watches.next_id;
        watches.by_region.insert(
            region,
            Watch {
                id,
                sink,
                options: options.clone(),
            },
        );

        Ok(Box::new(SignalObservation {
            watches: Arc::downgrade(&self.inner),
            region,
            id,
        }))
    }
}

struct SignalObservation {
    watches: Weak<Mutex<Watches>>,
    region: RegionHandle,
    id: u64,
}

impl Observation for SignalObservation {
    fn disconnect(self: Box<Self>) {
        let Some(inner) = self.watches.upgrade() else {
            return;
        };
        let mut watches = inner.lock().unwrap_or_else(PoisonError::into_inner);
        if watches
            .by_region
            .get(&self.region)
            .is_some_and(|w| w.id == self.id)
        {
            watches.by_region.remove(&self.region);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::VisibilityGate;

    fn gate(detector: &SignalDetector, region: RegionHandle) -> VisibilityGate {
        VisibilityGate::new(region, ObserverOptions::default(), Some(Arc::new(detector.clone())))
    }

    #[test]
    fn test_region_can_be_observed_again_after_release() {
        let detector = SignalDetector::new();
        let region = RegionHandle::new(1);
        let first = gate(&detector, region);
        let second = gate(&detector, region);

        first.activate().expect("first");
        let err = second.activate().expect_err("region taken");
        assert_eq!(err.as_label(), "gate_detector");
        assert!(!second.is_watching());

        first.deactivate();
        second.activate().expect("region free again");
        assert!(second.is_watching());
        assert_eq!(detector.observed_count(), 1);
    }

    #[test]
    fn test_push_to_unobserved_region_is_dropped() {
        let detector = SignalDetector::new();
        assert!(!detector.push(RegionHandle::new(3), IntersectionEntry::visible(1.0)));
    }
}
