//! Capped, newest-first history of relevant entity updates.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::config::HISTORY_CAPACITY;
use crate::entity::EntityKey;

/// A relevant change to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityUpdate {
    /// Key sequence of the entity.
    pub entity_keys: Vec<EntityKey>,
    /// Components that changed.
    pub component_names: Vec<String>,
}

/// Reactive holder of the most recent [`EntityUpdate`]s.
///
/// The current list is readable synchronously; subscribers receive the
/// current list first, then the list after each change. A lagging subscriber
/// only sees the latest list.
#[derive(Debug)]
pub struct UpdateLog {
    tx: watch::Sender<Vec<EntityUpdate>>,
    capacity: usize,
}

impl UpdateLog {
    /// Creates an empty log holding [`HISTORY_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Creates an empty log holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Puts `update` first, dropping the oldest entry beyond capacity.
    pub fn prepend(&self, update: EntityUpdate) {
        self.prepend_capped(update, self.capacity);
    }

    /// Like [`prepend`](Self::prepend), keeping at most `limit` entries.
    ///
    /// The log's own capacity still bounds the list when `limit` is larger.
    pub fn prepend_capped(&self, update: EntityUpdate, limit: usize) {
        let keep = limit.clamp(1, self.capacity);
        self.tx.send_modify(|list| {
            list.insert(0, update);
            list.truncate(keep);
        });
    }

    /// Current list, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EntityUpdate> {
        self.tx.borrow().clone()
    }

    /// Stream of lists, starting with the current one.
    #[must_use]
    pub fn subscribe(&self) -> WatchStream<Vec<EntityUpdate>> {
        WatchStream::new(self.tx.subscribe())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for UpdateLog {
    fn default() -> Self {
        Self::new()
    }
}
