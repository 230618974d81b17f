//! # VisibilityGate: single-shot "became visible" trigger.
//!
//! A gate binds one region to one callback. It decides **when** the loader runs.
//!
//! ## Phases
//! ```text
//!            activate()                 entry crosses threshold
//!   Idle ───────────────► Watching ─────────────────────────────► Fired
//!    │                       │                                      ▲
//!    │ deactivate()          │ deactivate()                         │ force_fire()
//!    ▼                       ▼                                      │
//!  Released ◄────────────────┘                          Idle/Watching
//!
//!   no detector ──► constructed directly in Fired
//! ```
//!
//! ## Rules
//! - The callback runs **at most once** per gate, whatever the number of entries.
//! - On firing, the observation is disconnected **before** the callback runs.
//! - On teardown before firing, the observation is disconnected and the callback
//!   is dropped without running.
//! - The observation is disconnected exactly once (fire or teardown, never both).
//! - Dropping the gate tears it down.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::ObserverOptions;
use crate::error::GateError;
use crate::events::{Bus, Event, EventKind};

use super::detector::{IntersectionEntry, Observation, RegionHandle, VisibilityDetector};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Why a gate fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireSource {
    /// An intersection entry crossed the threshold.
    Intersection,
    /// The gate was built without a detector.
    NoDetector,
    /// The host requested loading via [`VisibilityGate::force_fire`].
    Forced,
}

impl FireSource {
    fn as_str(&self) -> &'static str {
        match self {
            FireSource::Intersection => "intersection",
            FireSource::NoDetector => "no-detector",
            FireSource::Forced => "forced",
        }
    }
}

enum Phase {
    Idle,
    /// `detector.observe` is running; fires are deferred until it returns.
    Activating,
    Watching(Box<dyn Observation>),
    Fired(FireSource),
    Released,
}

struct GateState {
    phase: Phase,
    callback: Option<Callback>,
    callback_registered: bool,
    deferred_fire: Option<FireSource>,
    intersecting: bool,
}

struct GateShared {
    region: RegionHandle,
    options: ObserverOptions,
    trigger_ratio: f64,
    detector: Option<Arc<dyn VisibilityDetector>>,
    events: Option<(Bus, Arc<str>)>,
    state: Mutex<GateState>,
}

impl GateShared {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, kind: EventKind, source: Option<FireSource>) {
        if let Some((bus, name)) = &self.events {
            let mut ev = Event::new(kind)
                .with_loadable(Arc::clone(name))
                .with_region(self.region);
            if let Some(source) = source {
                ev = ev.with_reason(source.as_str());
            }
            bus.publish(ev);
        }
    }

    fn on_entry(&self, entry: IntersectionEntry) -> bool {
        let crossed = {
            let mut st = self.lock();
            if !matches!(st.phase, Phase::Watching(_) | Phase::Activating) {
                return false;
            }
            let now = entry.is_intersecting && entry.ratio >= self.trigger_ratio;
            let crossed = now && !st.intersecting;
            st.intersecting = now;
            crossed
        };
        if crossed {
            self.fire(FireSource::Intersection);
        }
        true
    }

    /// Transitions to `Fired`, disconnecting first and then running the callback.
    fn fire(&self, source: FireSource) -> bool {
        let (observation, callback) = {
            let mut guard = self.lock();
            let st = &mut *guard;
            match st.phase {
                Phase::Fired(_) | Phase::Released => return false,
                Phase::Activating => {
                    st.deferred_fire.get_or_insert(source);
                    return true;
                }
                Phase::Idle | Phase::Watching(_) => {}
            }
            let observation = match mem::replace(&mut st.phase, Phase::Fired(source)) {
                Phase::Watching(observation) => Some(observation),
                _ => None,
            };
            (observation, st.callback.take())
        };

        if let Some(observation) = observation {
            observation.disconnect();
        }
        self.publish(EventKind::GateFired, Some(source));
        if let Some(callback) = callback {
            callback();
        }
        true
    }
}

/// Handle given to a detector for reporting intersection entries.
///
/// Holds the gate weakly: entries reported after the gate is gone are ignored.
#[derive(Clone)]
pub struct IntersectionSink {
    gate: Weak<GateShared>,
}

impl IntersectionSink {
    /// Reports one entry. Returns `false` when the gate no longer listens.
    pub fn notify(&self, entry: IntersectionEntry) -> bool {
        match self.gate.upgrade() {
            Some(gate) => gate.on_entry(entry),
            None => false,
        }
    }

    /// Whether the gate is gone.
    pub fn is_closed(&self) -> bool {
        self.gate.strong_count() == 0
    }
}

/// Single-shot visibility trigger around an injected [`VisibilityDetector`].
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use lazygate::{IntersectionEntry, ObserverOptions, RegionHandle, SignalDetector, VisibilityGate};
///
/// let detector = SignalDetector::new();
/// let region = RegionHandle::new(1);
/// let gate = VisibilityGate::new(region, ObserverOptions::default(), Some(Arc::new(detector.clone())));
///
/// let fired = Arc::new(AtomicUsize::new(0));
/// let counter = fired.clone();
/// gate.on_became_visible(move || { counter.fetch_add(1, Ordering::SeqCst); }).unwrap();
/// gate.activate().unwrap();
///
/// detector.push(region, IntersectionEntry::visible(0.3));
/// detector.push(region, IntersectionEntry::visible(0.9));
/// assert_eq!(fired.load(Ordering::SeqCst), 1);
/// assert!(!detector.is_observing(region));
/// ```
pub struct VisibilityGate {
    shared: Arc<GateShared>,
}

impl VisibilityGate {
    /// Creates a gate for `region`.
    ///
    /// With `detector = None` the gate is pre-fired: it behaves as if the region
    /// were already visible and never creates an observation.
    pub fn new(
        region: RegionHandle,
        options: ObserverOptions,
        detector: Option<Arc<dyn VisibilityDetector>>,
    ) -> Self {
        Self::build(region, options, detector, None)
    }

    pub(crate) fn with_events(
        region: RegionHandle,
        options: ObserverOptions,
        detector: Option<Arc<dyn VisibilityDetector>>,
        bus: Bus,
        name: Arc<str>,
    ) -> Self {
        Self::build(region, options, detector, Some((bus, name)))
    }

    fn build(
        region: RegionHandle,
        options: ObserverOptions,
        detector: Option<Arc<dyn VisibilityDetector>>,
        events: Option<(Bus, Arc<str>)>,
    ) -> Self {
        let phase = if detector.is_some() {
            Phase::Idle
        } else {
            Phase::Fired(FireSource::NoDetector)
        };
        let shared = Arc::new(GateShared {
            region,
            trigger_ratio: options.trigger_ratio(),
            options,
            detector,
            events,
            state: Mutex::new(GateState {
                phase,
                callback: None,
                callback_registered: false,
                deferred_fire: None,
                intersecting: false,
            }),
        });
        if shared.detector.is_none() {
            shared.publish(EventKind::GateFired, Some(FireSource::NoDetector));
        }
        Self { shared }
    }

    /// Registers the single callback to run when the region first becomes visible.
    ///
    /// - Already fired: the callback runs immediately, on the calling thread.
    /// - Already released: the callback is dropped without running.
    /// - Second registration: [`GateError::CallbackAlreadySet`].
    pub fn on_became_visible<F>(&self, callback: F) -> Result<(), GateError>
    where
        F: FnOnce() + Send + 'static,
    {
        let run_now = {
            let mut guard = self.shared.lock();
            let st = &mut *guard;
            if st.callback_registered {
                return Err(GateError::CallbackAlreadySet);
            }
            st.callback_registered = true;
            match st.phase {
                Phase::Fired(_) => true,
                Phase::Released => false,
                _ => {
                    st.callback = Some(Box::new(callback));
                    return Ok(());
                }
            }
        };
        if run_now {
            callback();
        }
        Ok(())
    }

    /// Starts observing the region (host mount).
    ///
    /// No-op unless the gate is idle. If the detector reports visibility from
    /// inside `observe`, the observation is disconnected as soon as `observe`
    /// returns and the callback runs after that.
    pub fn activate(&self) -> Result<(), GateError> {
        let detector = {
            let mut st = self.shared.lock();
            let detector = match (&st.phase, &self.shared.detector) {
                (Phase::Idle, Some(detector)) => Arc::clone(detector),
                _ => return Ok(()),
            };
            st.phase = Phase::Activating;
            detector
        };
        self.shared.publish(EventKind::GateActivated, None);

        let sink = IntersectionSink {
            gate: Arc::downgrade(&self.shared),
        };
        let result = detector.observe(self.shared.region, &self.shared.options, sink);

        let mut guard = self.shared.lock();
        let st = &mut *guard;
        let observation = match result {
            Ok(observation) => observation,
            Err(err) => {
                if matches!(st.phase, Phase::Activating) {
                    st.phase = Phase::Idle;
                    st.deferred_fire = None;
                    st.intersecting = false;
                }
                return Err(err);
            }
        };

        match st.phase {
            Phase::Activating => match st.deferred_fire.take() {
                Some(source) => {
                    st.phase = Phase::Fired(source);
                    let callback = st.callback.take();
                    drop(guard);
                    observation.disconnect();
                    self.shared.publish(EventKind::GateFired, Some(source));
                    if let Some(callback) = callback {
                        callback();
                    }
                }
                None => st.phase = Phase::Watching(observation),
            },
            // Torn down while observing started.
            _ => {
                drop(guard);
                observation.disconnect();
            }
        }
        Ok(())
    }

    /// Tears the gate down (host unmount).
    ///
    /// Before firing: disconnects the observation and drops the callback without
    /// running it; returns `true`. After firing or a previous teardown: no-op,
    /// returns `false`.
    pub fn deactivate(&self) -> bool {
        let (observation, callback) = {
            let mut st = self.shared.lock();
            if matches!(st.phase, Phase::Fired(_) | Phase::Released) {
                return false;
            }
            let observation = match mem::replace(&mut st.phase, Phase::Released) {
                Phase::Watching(observation) => Some(observation),
                _ => None,
            };
            st.deferred_fire = None;
            (observation, st.callback.take())
        };

        if let Some(observation) = observation {
            observation.disconnect();
        }
        drop(callback);
        self.shared.publish(EventKind::GateReleased, None);
        true
    }

    /// Fires without waiting for an intersection (host preload).
    ///
    /// Returns `false` if the gate already fired or was released.
    pub fn force_fire(&self) -> bool {
        self.shared.fire(FireSource::Forced)
    }

    /// Whether the gate has fired.
    pub fn is_fired(&self) -> bool {
        matches!(self.shared.lock().phase, Phase::Fired(_))
    }

    /// What made the gate fire, if it did.
    pub fn fire_source(&self) -> Option<FireSource> {
        match self.shared.lock().phase {
            Phase::Fired(source) => Some(source),
            _ => None,
        }
    }

    /// Whether a detector observation is currently live.
    pub fn is_watching(&self) -> bool {
        matches!(self.shared.lock().phase, Phase::Watching(_))
    }

    /// Whether the gate was torn down before firing.
    pub fn is_released(&self) -> bool {
        matches!(self.shared.lock().phase, Phase::Released)
    }

    /// Region this gate watches.
    pub fn region(&self) -> RegionHandle {
        self.shared.region
    }
}

impl Drop for VisibilityGate {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{ImmediateDetector, SignalDetector};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        (hits, move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn signal_gate(options: ObserverOptions) -> (VisibilityGate, SignalDetector, RegionHandle) {
        let detector = SignalDetector::new();
        let region = RegionHandle::new(7);
        let gate = VisibilityGate::new(region, options, Some(Arc::new(detector.clone())));
        (gate, detector, region)
    }

    #[test]
    fn test_fires_once_for_many_entries() {
        let (gate, detector, region) = signal_gate(ObserverOptions::default());
        let (hits, cb) = counter();
        gate.on_became_visible(cb).unwrap();
        gate.activate().unwrap();
        assert!(gate.is_watching());

        assert!(detector.push(region, IntersectionEntry::visible(0.5)));
        for _ in 0..10 {
            detector.push(region, IntersectionEntry::hidden());
            detector.push(region, IntersectionEntry::visible(1.0));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(gate.is_fired());
        assert_eq!(gate.fire_source(), Some(FireSource::Intersection));
    }

    #[test]
    fn test_stale_sink_is_ignored_after_fire() {
        struct Leaky(Mutex<Option<IntersectionSink>>);
        struct Nothing;
        impl Observation for Nothing {
            fn disconnect(self: Box<Self>) {}
        }
        impl VisibilityDetector for Leaky {
            fn observe(
                &self,
                _region: RegionHandle,
                _options: &ObserverOptions,
                sink: IntersectionSink,
            ) -> Result<Box<dyn Observation>, GateError> {
                *self.0.lock().unwrap() = Some(sink);
                Ok(Box::new(Nothing))
            }
        }

        let leaky = Arc::new(Leaky(Mutex::new(None)));
        let detector: Arc<dyn VisibilityDetector> = leaky.clone();
        let gate = VisibilityGate::new(RegionHandle::new(1), ObserverOptions::default(), Some(detector));
        let (hits, cb) = counter();
        gate.on_became_visible(cb).unwrap();
        gate.activate().unwrap();

        let sink = leaky.0.lock().unwrap().clone().unwrap();
        assert!(sink.notify(IntersectionEntry::visible(1.0)));
        for _ in 0..5 {
            assert!(!sink.notify(IntersectionEntry::hidden()));
            assert!(!sink.notify(IntersectionEntry::visible(1.0)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        drop(gate);
        assert!(sink.is_closed());
    }

    #[test]
    fn test_threshold_must_be_reached() {
        let (gate, detector, region) = signal_gate(ObserverOptions::default().with_threshold(0.5));
        let (hits, cb) = counter();
        gate.on_became_visible(cb).unwrap();
        gate.activate().unwrap();

        detector.push(region, IntersectionEntry::visible(0.2));
        detector.push(region, IntersectionEntry::visible(0.49));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(detector.is_observing(region));

        detector.push(region, IntersectionEntry::visible(0.5));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnects_before_callback() {
        let (gate, detector, region) = signal_gate(ObserverOptions::default());
        let seen = Arc::new(Mutex::new(None));
        let observer = detector.clone();
        let seen_in_cb = seen.clone();
        gate.on_became_visible(move || {
            *seen_in_cb.lock().unwrap() = Some(observer.is_observing(region));
        })
        .unwrap();
        gate.activate().unwrap();
        detector.push(region, IntersectionEntry::visible(1.0));

        assert_eq!(*seen.lock().unwrap(), Some(false));
        assert_eq!(detector.observed_count(), 0);
    }

    #[test]
    fn test_teardown_before_fire_releases_without_callback() {
        let (gate, detector, region) = signal_gate(ObserverOptions::default());
        let (hits, cb) = counter();
        gate.on_became_visible(cb).unwrap();
        gate.activate().unwrap();

        assert!(gate.deactivate());
        assert!(gate.is_released());
        assert!(!detector.is_observing(region));
        assert!(!detector.push(region, IntersectionEntry::visible(1.0)));
        assert!(!gate.force_fire());
        assert!(!gate.deactivate());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_teardown_after_fire_is_noop() {
        let (gate, detector, region) = signal_gate(ObserverOptions::default());
        let (hits, cb) = counter();
        gate.on_became_visible(cb).unwrap();
        gate.activate().unwrap();
        detector.push(region, IntersectionEntry::visible(1.0));

        assert!(!gate.deactivate());
        assert!(gate.is_fired());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_detector_is_prefired() {
        let gate = VisibilityGate::new(RegionHandle::new(3), ObserverOptions::default(), None);
        assert!(gate.is_fired());
        assert_eq!(gate.fire_source(), Some(FireSource::NoDetector));

        let (hits, cb) = counter();
        gate.on_became_visible(cb).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        gate.activate().unwrap();
        assert!(!gate.is_watching());
    }

    #[test]
    fn test_immediate_detector_fires_on_activate() {
        let gate = VisibilityGate::new(
            RegionHandle::new(4),
            ObserverOptions::default(),
            Some(Arc::new(ImmediateDetector)),
        );
        let (hits, cb) = counter();
        gate.on_became_visible(cb).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        gate.activate().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(gate.is_fired());
        assert!(!gate.is_watching());
    }

    #[test]
    fn test_second_callback_rejected() {
        let (gate, _detector, _region) = signal_gate(ObserverOptions::default());
        gate.on_became_visible(|| {}).unwrap();
        assert_eq!(gate.on_became_visible(|| {}), Err(GateError::CallbackAlreadySet));
    }

    #[test]
    fn test_force_fire_before_activation() {
        let (gate, detector, region) = signal_gate(ObserverOptions::default());
        let (hits, cb) = counter();
        gate.on_became_visible(cb).unwrap();
        assert!(gate.force_fire());
        assert_eq!(gate.fire_source(), Some(FireSource::Forced));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        gate.activate().unwrap();
        assert!(!detector.is_observing(region));
    }

    #[test]
    fn test_drop_releases_observation() {
        let (gate, detector, region) = signal_gate(ObserverOptions::default());
        gate.activate().unwrap();
        assert!(detector.is_observing(region));
        drop(gate);
        assert!(!detector.is_observing(region));
    }

    #[test]
    fn test_detector_error_keeps_gate_idle() {
        let detector = SignalDetector::new();
        let region = RegionHandle::new(9);
        let first = VisibilityGate::new(region, ObserverOptions::default(), Some(Arc::new(detector.clone())));
        let second = VisibilityGate::new(region, ObserverOptions::default(), Some(Arc::new(detector.clone())));
        first.activate().unwrap();

        let err = second.activate().unwrap_err();
        assert_eq!(err.as_label(), "gate_detector");
        assert!(!second.is_watching());
        assert!(!second.is_fired());
    }

    #[test]
    fn test_options_forwarded_verbatim() {
        let options = ObserverOptions::default()
            .with_root_margin("200px")
            .with_threshold(0.25);
        let (gate, detector, region) = signal_gate(options.clone());
        gate.activate().unwrap();
        assert_eq!(detector.options_for(region), Some(options));
    }
}
