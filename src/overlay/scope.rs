//! Lifetime of one optimistic invocation's overrides.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::component::Component;
use crate::entity::EntityId;
use crate::storage::{ComponentStore, Override, StorageError};
use crate::value::Record;

use super::tag::OverrideTag;

/// Lifecycle of an [`OverlayScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayState {
    /// Nothing written yet.
    Idle,
    /// At least one override is visible in the store.
    Overlaid,
    /// Every override under the tag has been removed.
    Settled,
}

/// Owns a fresh [`OverrideTag`] and every override written under it.
///
/// Settling removes the tag's overrides exactly once. Dropping an unsettled
/// scope settles it, so overrides never outlive their scope even when the
/// owning future is cancelled or panics.
pub struct OverlayScope {
    tag: OverrideTag,
    store: Arc<dyn ComponentStore>,
    state: OverlayState,
    applied: usize,
}

impl OverlayScope {
    /// Opens a scope with a fresh tag.
    #[must_use]
    pub fn new(store: Arc<dyn ComponentStore>) -> Self {
        Self {
            tag: OverrideTag::new(),
            store,
            state: OverlayState::Idle,
            applied: 0,
        }
    }

    #[must_use]
    pub const fn tag(&self) -> OverrideTag {
        self.tag
    }

    #[must_use]
    pub const fn state(&self) -> OverlayState {
        self.state
    }

    /// Number of overrides written so far.
    #[must_use]
    pub const fn applied(&self) -> usize {
        self.applied
    }

    /// Store the scope writes into; predictions read current values here.
    #[must_use]
    pub fn store(&self) -> &dyn ComponentStore {
        self.store.as_ref()
    }

    /// Layers `value` over `component` of `entity` under this scope's tag.
    pub fn apply(&mut self, component: &str, entity: EntityId, value: Record) -> Result<(), StorageError> {
        if self.state == OverlayState::Settled {
            return Err(StorageError::BackendError(format!(
                "overlay {} already settled",
                self.tag
            )));
        }

        self.store
            .add_override(self.tag, Override::new(component, entity, value))?;
        self.state = OverlayState::Overlaid;
        self.applied += 1;

        debug!(tag = %self.tag, component, entity = %entity, "override applied");
        Ok(())
    }

    /// Layers a full typed value.
    pub fn apply_component<C: Component>(&mut self, entity: EntityId, value: &C) -> Result<(), StorageError> {
        self.apply(C::NAME, entity, value.to_record()?)
    }

    /// Layers a subset of a typed component's fields.
    pub fn apply_fields<C: Component>(&mut self, entity: EntityId, partial: Record) -> Result<(), StorageError> {
        self.apply(C::NAME, entity, partial)
    }

    /// Removes every override under the tag. Returns how many were removed.
    ///
    /// Idempotent: only the first call touches the store.
    pub fn settle(&mut self) -> usize {
        if self.state == OverlayState::Settled {
            return 0;
        }
        self.state = OverlayState::Settled;

        match self.store.remove_override(self.tag) {
            Ok(removed) => {
                debug!(tag = %self.tag, removed, "overlay settled");
                removed
            }
            Err(e) => {
                warn!(tag = %self.tag, error = %e, "failed to remove overrides");
                0
            }
        }
    }
}

impl fmt::Debug for OverlayScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayScope")
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

impl Drop for OverlayScope {
    fn drop(&mut self) {
        if self.state != OverlayState::Settled {
            let removed = self.settle();
            debug!(tag = %self.tag, removed, "overlay settled on drop");
        }
    }
}
