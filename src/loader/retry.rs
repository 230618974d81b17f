//! # RetryingLoader: attempt / backoff / terminal-failure loop.
//!
//! Drives one [`LoadTask`] to a terminal outcome and writes it into the
//! task's [`ResolveSlot`].
//!
//! ## Event flow
//! ```text
//! AttemptStarting → [producer] → LoadSucceeded
//!                              → AttemptFailed → BackoffScheduled → [sleep] → (next attempt)
//!                              → AttemptFailed → RetriesExhausted
//!
//! Consumer gone or teardown requested at any safe point → Abandoned
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** (never two producer futures at once)
//! - Attempt counter grows by exactly one per failed attempt
//! - Terminal failure happens when `attempt > max_retries` after a failure, never before
//! - Abandonment and cancellation are checked before each attempt, right after
//!   it returns and during backoff; a running attempt is never preempted, but its
//!   result is dropped once teardown was requested
//! - The slot is written at most once; a duplicate write is a bug and panics in
//!   debug builds

use std::sync::Arc;

use tokio::{select, sync::watch, time};
use tokio_util::sync::CancellationToken;

use crate::{
    config::LoadOptions,
    error::{LoadError, SlotError},
    events::{Bus, Event, EventKind},
    loader::{
        producer::ProducerRef,
        slot::{Outcome, ResolveSlot},
        state::LoadState,
    },
    policies::BackoffPolicy,
};

/// The unit of deferred work plus its retry budget.
pub struct LoadTask<T> {
    producer: ProducerRef<T>,
    max_retries: u32,
    backoff: BackoffPolicy,
}

impl<T> LoadTask<T> {
    /// Creates a task taking its retry budget and backoff from `options`.
    pub fn new(producer: ProducerRef<T>, options: &LoadOptions) -> Self {
        Self::with_backoff(producer, options.max_retries, options.backoff())
    }

    /// Creates a task with an explicit backoff policy.
    pub fn with_backoff(producer: ProducerRef<T>, max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            producer,
            max_retries,
            backoff,
        }
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff policy used between attempts.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }
}

/// Executes a [`LoadTask`] and resolves its slot exactly once.
pub(crate) struct RetryingLoader<T> {
    task: LoadTask<T>,
    slot: ResolveSlot<T>,
    state: watch::Sender<LoadState>,
    bus: Bus,
    name: Arc<str>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> RetryingLoader<T> {
    pub(crate) fn new(
        task: LoadTask<T>,
        slot: ResolveSlot<T>,
        state: watch::Sender<LoadState>,
        bus: Bus,
        name: Arc<str>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task,
            slot,
            state,
            bus,
            name,
            cancel,
        }
    }

    /// Runs attempts until success, exhaustion or abandonment.
    ///
    /// Returns the last published state.
    pub(crate) async fn run(mut self) -> LoadState {
        let mut attempt: u32 = 0;

        loop {
            if self.slot.is_abandoned() || self.cancel.is_cancelled() {
                self.publish_abandoned(attempt);
                return *self.state.borrow();
            }

            attempt += 1;
            self.set_state(LoadState::Attempting { attempt });
            self.bus.publish(
                Event::new(EventKind::AttemptStarting)
                    .with_loadable(Arc::clone(&self.name))
                    .with_attempt(attempt),
            );

            let result = self.task.producer.produce().await;
            // Teardown during the attempt: the result is discarded, whatever it is.
            if self.cancel.is_cancelled() {
                self.publish_abandoned(attempt);
                return *self.state.borrow();
            }

            match result {
                Ok(value) => {
                    if self.deliver(Ok(value)) {
                        self.set_state(LoadState::Succeeded { attempts: attempt });
                        self.bus.publish(
                            Event::new(EventKind::LoadSucceeded)
                                .with_loadable(Arc::clone(&self.name))
                                .with_attempt(attempt),
                        );
                    } else {
                        self.publish_abandoned(attempt);
                    }
                    return *self.state.borrow();
                }
                Err(error) => {
                    let reason: Arc<str> = Arc::from(error.to_string());
                    let failure = LoadError::Transient { attempt, error };
                    tracing::warn!(loadable = %self.name, "{failure}");
                    self.bus.publish(
                        Event::new(EventKind::AttemptFailed)
                            .with_loadable(Arc::clone(&self.name))
                            .with_attempt(attempt)
                            .with_reason(Arc::clone(&reason)),
                    );

                    if attempt > self.task.max_retries() {
                        tracing::warn!(loadable = %self.name, "retries exhausted, attempts={attempt}");
                        if self.deliver(Err(failure.into_exhausted())) {
                            self.set_state(LoadState::Failed { attempts: attempt });
                            self.bus.publish(
                                Event::new(EventKind::RetriesExhausted)
                                    .with_loadable(Arc::clone(&self.name))
                                    .with_attempt(attempt)
                                    .with_reason(reason),
                            );
                        } else {
                            self.publish_abandoned(attempt);
                        }
                        return *self.state.borrow();
                    }

                    let delay = self.task.backoff().next(attempt);
                    self.set_state(LoadState::AwaitingRetry { attempt, delay });
                    self.bus.publish(
                        Event::new(EventKind::BackoffScheduled)
                            .with_loadable(Arc::clone(&self.name))
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_reason(reason),
                    );

                    let sleep = time::sleep(delay);
                    tokio::pin!(sleep);
                    select! {
                        _ = &mut sleep => {}
                        _ = self.slot.abandoned() => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }
            }
        }
    }

    /// Writes the outcome; `false` if the consumer is gone.
    fn deliver(&mut self, outcome: Outcome<T>) -> bool {
        match self.slot.resolve(outcome) {
            Ok(()) => true,
            Err(SlotError::Abandoned) => false,
            Err(SlotError::AlreadyResolved) => {
                if cfg!(debug_assertions) {
                    panic!("loadable '{}' resolved twice", self.name);
                }
                tracing::error!(loadable = %self.name, "duplicate resolution ignored");
                false
            }
        }
    }

    fn set_state(&self, state: LoadState) {
        self.state.send_replace(state);
    }

    fn publish_abandoned(&self, attempt: u32) {
        tracing::debug!(loadable = %self.name, attempt, "consumer abandoned the load");
        let mut ev = Event::new(EventKind::Abandoned).with_loadable(Arc::clone(&self.name));
        if attempt > 0 {
            ev = ev.with_attempt(attempt);
        }
        self.bus.publish(ev);
    }
}
