use std::sync::Arc;

use tokio::{
    runtime::Handle,
    sync::{oneshot, watch},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::LoadOptions,
    error::{ConfigError, LoadError},
    events::Bus,
    gate::{RegionHandle, VisibilityDetector, VisibilityGate},
    loader::{LoadState, LoadTask, ProducerRef, ResolveSlot, RetryingLoader},
    subscribers::{Subscribe, SubscriberSet},
};

use super::handle::{LoadableControls, LoadableHandle};

/// Builder for a [`LoadableHandle`] with optional detector, name and subscribers.
pub struct LoadableBuilder<T> {
    producer: ProducerRef<T>,
    region: RegionHandle,
    options: LoadOptions,
    detector: Option<Arc<dyn VisibilityDetector>>,
    name: Option<Arc<str>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<T: Send + 'static> LoadableBuilder<T> {
    /// Creates a builder with default options and no detector.
    pub fn new(producer: ProducerRef<T>, region: RegionHandle) -> Self {
        Self {
            producer,
            region,
            options: LoadOptions::default(),
            detector: None,
            name: None,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the load options.
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the visibility detector.
    ///
    /// Without one, loading starts as soon as the handle is built.
    pub fn with_detector(mut self, detector: Option<Arc<dyn VisibilityDetector>>) -> Self {
        self.detector = detector;
        self
    }

    /// Sets the name used in events and logs (default `loadable-{region id}`).
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive this loadable's events through dedicated workers
    /// with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Validates the options and wires gate, loader and handle together.
    ///
    /// Must be called from within a tokio runtime; the loader runs on a task
    /// spawned there. Fails with [`LoadError::Config`] before any attempt when
    /// the options are invalid or no runtime is available.
    pub fn build(self) -> Result<LoadableHandle<T>, LoadError> {
        self.options.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let name = self
            .name
            .unwrap_or_else(|| Arc::from(format!("loadable-{}", self.region.id())));
        let bus = Bus::new(self.options.bus_capacity_clamped());

        if !self.subscribers.is_empty() {
            let rx = bus.subscribe();
            let set = SubscriberSet::new(self.subscribers);
            runtime.spawn(set.listen(rx));
        }

        let (state_tx, state_rx) = watch::channel(LoadState::Idle);
        let (slot, outcome) = ResolveSlot::channel();
        let (visible_tx, visible_rx) = oneshot::channel::<()>();
        let cancel = CancellationToken::new();

        let loader = RetryingLoader::new(
            LoadTask::new(self.producer, &self.options),
            slot,
            state_tx,
            bus.clone(),
            Arc::clone(&name),
            cancel.clone(),
        );
        runtime.spawn(async move {
            // Err: the gate was released before firing.
            if visible_rx.await.is_ok() {
                loader.run().await;
            }
        });

        let gate = Arc::new(VisibilityGate::with_events(
            self.region,
            self.options.observer_options.clone(),
            self.detector,
            bus.clone(),
            Arc::clone(&name),
        ));
        gate.on_became_visible(move || {
            let _ = visible_tx.send(());
        })?;

        Ok(LoadableHandle::new(
            name,
            LoadableControls::new(gate, cancel),
            outcome,
            state_rx,
            bus,
            self.options.timeout,
        ))
    }
}
