//! # Loadables: a visibility gate chained to a retrying loader.
//!
//! ```text
//! create_lazy_loadable(producer, options, detector, region)
//!     │
//!     ├─► VisibilityGate ── fires once ──► oneshot ──► driver task ──► RetryingLoader::run
//!     │        ▲                                                            │
//!     │   activate / teardown / preload                              ResolveSlot (once)
//!     │        │                                                            │
//!     └─► LoadableHandle ◄──────────────── outcome / state watch / events ◄─┘
//! ```
//!
//! ## Contents
//! - [`create_lazy_loadable`] one-call entry point
//! - [`LoadableBuilder`] for names and event subscribers
//! - [`LoadableHandle`], [`LoadableControls`] consumer and host lifecycle side
//! - [`Presenter`] host rendering hooks

mod builder;
mod handle;
mod presenter;

use std::future::Future;
use std::sync::Arc;

pub use builder::LoadableBuilder;
pub use handle::{LoadableControls, LoadableHandle};
pub use presenter::Presenter;

use crate::{
    config::LoadOptions,
    error::{BoxError, LoadError},
    gate::{RegionHandle, VisibilityDetector},
    loader::{ProducerFn, ProducerRef},
};

/// Creates a loadable for `loader`, gated on `region` becoming visible.
///
/// With `detector = None` loading starts immediately; otherwise it starts on
/// the first intersection after [`LoadableHandle::activate`].
///
/// # Example
/// ```rust
/// use lazygate::{create_lazy_loadable, BoxError, LoadOptions, RegionHandle};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let handle = create_lazy_loadable(
///     || async { Ok::<_, BoxError>("hello") },
///     LoadOptions::default(),
///     None,
///     RegionHandle::new(1),
/// )
/// .expect("valid options");
///
/// assert_eq!(handle.outcome().await.expect("loaded"), "hello");
/// # }
/// ```
pub fn create_lazy_loadable<T, F, Fut, E>(
    loader: F,
    options: LoadOptions,
    detector: Option<Arc<dyn VisibilityDetector>>,
    region: RegionHandle,
) -> Result<LoadableHandle<T>, LoadError>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError>,
{
    let producer: ProducerRef<T> = ProducerFn::arc(loader);
    LoadableHandle::builder(producer, region)
        .with_options(options)
        .with_detector(detector)
        .build()
}
