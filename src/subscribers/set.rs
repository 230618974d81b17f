//! # Per-loadable subscriber fan-out.
//!
//! A loadable built with subscribers owns one [`SubscriberSet`]. Its listener
//! task drains the loadable's bus and copies each event into every subscriber's
//! own bounded queue, so a slow or panicking subscriber never holds up the gate,
//! the loader or the other subscribers.
//!
//! ```text
//! Bus ──► listen() ──► emit ─┬─► [queue] ─► worker ─► logger.on_event()
//!                            └─► [queue] ─► worker ─► metrics.on_event()
//! ```
//!
//! A full queue drops the event for that subscriber only, with a `tracing`
//! warning. The listener ends once the gate, the loader and the handle have all
//! released the bus; it then waits for every worker to drain its queue.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
    },
    task::JoinHandle,
};

use crate::events::Event;

use super::Subscribe;

struct Lane {
    subscriber: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

/// Subscribers of one loadable, each behind its own queue and worker task.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let (lanes, workers): (Vec<_>, Vec<_>) = subs
            .into_iter()
            .map(|sub| {
                let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let lane = Lane {
                    subscriber: sub.name(),
                    queue,
                };
                (lane, tokio::spawn(drain(sub, rx)))
            })
            .unzip();

        Self { lanes, workers }
    }

    /// Queues `event` for every subscriber without waiting on any of them.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for lane in &self.lanes {
            if let Err(err) = lane.queue.try_send(Arc::clone(&shared)) {
                let why = match err {
                    TrySendError::Full(_) => "queue full",
                    TrySendError::Closed(_) => "worker closed",
                };
                tracing::warn!(subscriber = lane.subscriber, kind = ?event.kind, "dropped event: {why}");
            }
        }
    }

    /// Forwards `rx` into the set until the bus closes, then shuts the workers down.
    ///
    /// A lagging receiver skips the lost events and keeps going.
    pub async fn listen(self, mut rx: broadcast::Receiver<Event>) {
        loop {
            match rx.recv().await {
                Ok(ev) => self.emit(&ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        self.shutdown().await;
    }

    /// Closes every queue and waits for the workers to finish what is queued.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        if let Err(payload) = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await {
            tracing::warn!(
                subscriber = sub.name(),
                kind = ?ev.kind,
                "subscriber panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Bus, EventKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.kinds.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber bug");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn test_listen_fans_out_until_bus_closes() {
        let recorder = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone(), Arc::new(Panicker)];
        let set = SubscriberSet::new(subs);
        assert_eq!(set.len(), 2);

        let bus = Bus::new(16);
        let listener = tokio::spawn(set.listen(bus.subscribe()));

        bus.publish(Event::new(EventKind::AttemptStarting));
        bus.publish(Event::new(EventKind::LoadSucceeded));
        drop(bus);

        listener.await.expect("listener");
        let kinds = recorder.kinds.lock().unwrap().clone();
        assert_eq!(kinds, vec![EventKind::AttemptStarting, EventKind::LoadSucceeded]);
    }

    #[tokio::test]
    async fn test_empty_set() {
        let set = SubscriberSet::new(Vec::new());
        assert!(set.is_empty());
        set.emit(&Event::new(EventKind::GateFired));
        set.shutdown().await;
    }

    #[test]
    fn test_panic_message_reads_common_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("static msg");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned msg"));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(literal.as_ref()), "static msg");
        assert_eq!(panic_message(owned.as_ref()), "owned msg");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
