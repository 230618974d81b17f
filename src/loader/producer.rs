//! # Deferred producers.
//!
//! A [`Producer`] is the unit of deferred work: a zero-argument async function
//! returning the loaded value or an error. Each call to [`Producer::produce`]
//! creates a **new, independent** future; nothing carries over between attempts.
//!
//! [`ProducerFn`] wraps a closure `F: Fn() -> Fut`; if attempts need shared state,
//! capture an `Arc<...>` explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use lazygate::{BoxError, ProducerFn, ProducerRef};
//!
//! let p: ProducerRef<String> = ProducerFn::arc(|| async {
//!     Ok::<_, BoxError>("payload".to_string())
//! });
//! # let _ = p;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BoxError;

/// Future returned by a single producer invocation.
pub type BoxProduceFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxError>> + Send + 'static>>;

/// Shared handle to a producer.
pub type ProducerRef<T> = Arc<dyn Producer<T>>;

/// # Asynchronous deferred producer.
pub trait Producer<T>: Send + Sync + 'static {
    /// Starts one attempt.
    fn produce(&self) -> BoxProduceFuture<T>;
}

/// Function-backed producer.
///
/// Wraps a closure that *creates* a new future per attempt.
#[derive(Debug)]
pub struct ProducerFn<F> {
    f: F,
}

impl<F> ProducerFn<F> {
    /// Creates a new function-backed producer.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the producer and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<T, F, Fut, E> Producer<T> for ProducerFn<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn produce(&self) -> BoxProduceFuture<T> {
        let fut = (self.f)();
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}
