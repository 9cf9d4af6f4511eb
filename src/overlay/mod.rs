//! Optimistic overlay engine.
//!
//! An optimistic invocation walks `Idle -> Overlaid -> Settled`:
//! predictions are written as overrides under a fresh tag, the real action
//! runs, and the tag is removed whatever the outcome.

mod scope;
mod tag;

pub use scope::{OverlayScope, OverlayState};
pub use tag::OverrideTag;

use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use crate::storage::{ComponentStore, StorageError};

/// Runs `action` with the overrides produced by `predict` visible.
///
/// The overrides are removed before this function returns, on success and on
/// failure, and the action's outcome is returned unchanged. A failing
/// prediction is logged; overrides it already wrote are still removed and the
/// real action is still issued. Dropping the returned future mid-flight also
/// removes the overrides.
///
/// `action` must not have started yet: futures are lazy, so build it from the
/// real call without awaiting.
pub async fn run_optimistic<T, E, P, F>(store: &Arc<dyn ComponentStore>, predict: P, action: F) -> Result<T, E>
where
    P: FnOnce(&mut OverlayScope) -> Result<(), StorageError>,
    F: Future<Output = Result<T, E>>,
{
    let mut scope = OverlayScope::new(Arc::clone(store));

    if let Err(e) = predict(&mut scope) {
        warn!(tag = %scope.tag(), error = %e, "prediction failed; issuing action without full overlay");
    }

    let outcome = action.await;
    scope.settle();
    outcome
}
