use crate::error::LoadError;
use crate::loader::LoadState;

/// # Host rendering hooks.
///
/// Driven by [`LoadableHandle::present`](crate::LoadableHandle::present):
/// - [`placeholder`](Presenter::placeholder) on every pending state (`Idle`,
///   `Attempting`, `AwaitingRetry`), starting with the current one
/// - [`content`](Presenter::content) exactly once on success
/// - [`error`](Presenter::error) exactly once on terminal failure
///
/// `content` and `error` are mutually exclusive.
///
/// # Example
/// ```rust
/// use lazygate::{LoadError, LoadState, Presenter};
///
/// struct Console;
///
/// impl Presenter<String> for Console {
///     fn placeholder(&self, state: &LoadState) {
///         println!("loading... ({} attempts so far)", state.attempts());
///     }
///
///     fn content(&self, value: String) {
///         println!("{value}");
///     }
///
///     fn error(&self, error: &LoadError) {
///         eprintln!("failed: {error}");
///     }
/// }
/// ```
pub trait Presenter<T>: Send + Sync {
    /// Renders the placeholder for a pending state.
    fn placeholder(&self, state: &LoadState);

    /// Renders the loaded value.
    fn content(&self, value: T);

    /// Renders a terminal failure.
    ///
    /// Default logs the error.
    fn error(&self, error: &LoadError) {
        tracing::error!(label = error.as_label(), "load failed: {error}");
    }
}
