//! # LoadableHandle: the consumer side of a lazy load.
//!
//! The handle owns the outcome receiver, the state watch and the timeout.
//! Lifecycle calls (`activate`, `teardown`, `preload`) go to the visibility
//! gate and can also be made through cloneable [`LoadableControls`], so a host
//! can keep mount/unmount hooks while a separate task awaits the outcome.
//!
//! ## Timeout
//! Measured from handle creation. When it elapses first, the handle publishes
//! `TimeoutHit`, tears the loadable down and returns [`LoadError::Timeout`].
//! The loader is never preempted mid-attempt, but it can no longer deliver.

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    select,
    sync::{broadcast, oneshot, watch},
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{GateError, LoadError},
    events::{Bus, Event, EventKind},
    gate::{RegionHandle, VisibilityGate},
    loader::{LoadState, Outcome, ProducerRef},
};

use super::{builder::LoadableBuilder, presenter::Presenter};

/// Cloneable lifecycle controls of one loadable.
///
/// The gate is torn down when the last controls (or the handle) go away.
#[derive(Clone)]
pub struct LoadableControls {
    gate: Arc<VisibilityGate>,
    cancel: CancellationToken,
}

impl LoadableControls {
    pub(crate) fn new(gate: Arc<VisibilityGate>, cancel: CancellationToken) -> Self {
        Self { gate, cancel }
    }

    /// Starts watching the region (host mount). No-op if already started or fired.
    pub fn activate(&self) -> Result<(), GateError> {
        self.gate.activate()
    }

    /// Host unmount.
    ///
    /// Before the gate fires, no attempt will ever start. After it fired, the
    /// loader stops at its next safe point (before an attempt or during
    /// backoff) and the consumer sees [`LoadError::Abandoned`].
    ///
    /// Returns `true` if the gate was released before firing.
    pub fn teardown(&self) -> bool {
        let released = self.gate.deactivate();
        self.cancel.cancel();
        released
    }

    /// Starts loading without waiting for visibility.
    ///
    /// Returns `false` if the gate already fired or was torn down.
    pub fn preload(&self) -> bool {
        self.gate.force_fire()
    }

    /// Whether loading has been triggered.
    pub fn is_fired(&self) -> bool {
        self.gate.is_fired()
    }

    /// Whether [`teardown`](Self::teardown) was called.
    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Region watched by the gate.
    pub fn region(&self) -> RegionHandle {
        self.gate.region()
    }
}

/// Consumer handle of one visibility-gated, retrying load.
pub struct LoadableHandle<T> {
    name: Arc<str>,
    controls: LoadableControls,
    outcome: oneshot::Receiver<Outcome<T>>,
    state: watch::Receiver<LoadState>,
    bus: Bus,
    deadline: Option<(Instant, Duration)>,
}

impl<T: Send + 'static> LoadableHandle<T> {
    /// Starts a [`LoadableBuilder`] for `producer` watching `region`.
    pub fn builder(producer: ProducerRef<T>, region: RegionHandle) -> LoadableBuilder<T> {
        LoadableBuilder::new(producer, region)
    }
}

impl<T> LoadableHandle<T> {
    pub(crate) fn new(
        name: Arc<str>,
        controls: LoadableControls,
        outcome: oneshot::Receiver<Outcome<T>>,
        state: watch::Receiver<LoadState>,
        bus: Bus,
        timeout: Option<Duration>,
    ) -> Self {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t).map(|at| (at, t)));
        Self {
            name,
            controls,
            outcome,
            state,
            bus,
            deadline,
        }
    }

    /// See [`LoadableControls::activate`].
    pub fn activate(&self) -> Result<(), GateError> {
        self.controls.activate()
    }

    /// See [`LoadableControls::teardown`].
    pub fn teardown(&self) -> bool {
        self.controls.teardown()
    }

    /// See [`LoadableControls::preload`].
    pub fn preload(&self) -> bool {
        self.controls.preload()
    }

    /// Cloneable lifecycle controls.
    pub fn controls(&self) -> LoadableControls {
        self.controls.clone()
    }

    /// Current loader state.
    pub fn state(&self) -> LoadState {
        *self.state.borrow()
    }

    /// Receiver of loader state changes.
    pub fn watch_state(&self) -> watch::Receiver<LoadState> {
        self.state.clone()
    }

    /// Raw event stream of this loadable, from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Name used in events and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the terminal outcome.
    ///
    /// - `Ok(value)` on success
    /// - [`LoadError::RetriesExhausted`] when every attempt failed
    /// - [`LoadError::Timeout`] when the timeout elapsed first
    /// - [`LoadError::Abandoned`] when the loadable was torn down before resolving
    pub async fn outcome(self) -> Result<T, LoadError> {
        let LoadableHandle {
            name,
            controls,
            outcome,
            bus,
            deadline,
            ..
        } = self;

        let received = match deadline {
            Some((at, timeout)) => match time::timeout_at(at, outcome).await {
                Ok(received) => received,
                Err(_elapsed) => {
                    tracing::warn!(loadable = %name, ?timeout, "load timed out");
                    bus.publish(
                        Event::new(EventKind::TimeoutHit)
                            .with_loadable(name)
                            .with_timeout(timeout),
                    );
                    controls.teardown();
                    return Err(LoadError::Timeout { timeout });
                }
            },
            None => outcome.await,
        };
        received.unwrap_or(Err(LoadError::Abandoned))
    }

    /// Drives `presenter` until the terminal outcome and returns it.
    ///
    /// The placeholder is rendered for the current state right away and again
    /// on every pending state change.
    pub async fn present<P>(self, presenter: &P) -> Result<(), LoadError>
    where
        P: Presenter<T> + ?Sized,
    {
        let mut states = self.state.clone();
        let current = *states.borrow_and_update();
        if current.is_pending() {
            presenter.placeholder(&current);
        }

        let outcome = self.outcome();
        tokio::pin!(outcome);
        let mut watching = true;

        let result = loop {
            select! {
                biased;
                result = &mut outcome => break result,
                changed = states.changed(), if watching => match changed {
                    Ok(()) => {
                        let state = *states.borrow_and_update();
                        if state.is_pending() {
                            presenter.placeholder(&state);
                        }
                    }
                    Err(_) => watching = false,
                },
            }
        };

        match result {
            Ok(value) => {
                presenter.content(value);
                Ok(())
            }
            Err(error) => {
                presenter.error(&error);
                Err(error)
            }
        }
    }
}
