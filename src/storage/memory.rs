//! In-memory component store.
//!
//! Thread-safe reference implementation of [`ComponentStore`]. Reads merge the
//! base record with live overrides on every call (merge-on-read), so removing
//! a tag immediately exposes the authoritative value again.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tracing::trace;

use crate::entity::EntityId;
use crate::overlay::OverrideTag;
use crate::storage::traits::{ComponentStore, Override, StorageError};
use crate::value::{merge_into, Record};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

type Key = (String, EntityId);

#[derive(Debug)]
struct OverrideEntry {
    tag: OverrideTag,
    value: Override,
}

#[derive(Debug, Default)]
struct StoreState {
    base: HashMap<Key, Record>,
    // Keyed by insertion sequence so iteration follows application order.
    overrides: BTreeMap<u64, OverrideEntry>,
    by_key: HashMap<Key, Vec<u64>>,
    next_seq: u64,
}

impl StoreState {
    fn resolve(&self, key: &Key) -> Option<Record> {
        let layered = self.by_key.get(key).filter(|seqs| !seqs.is_empty());
        let base = self.base.get(key);

        match (base, layered) {
            (None, None) => None,
            (Some(base), None) => Some(base.clone()),
            (base, Some(seqs)) => {
                let mut merged = base.cloned().unwrap_or_default();
                for seq in seqs {
                    if let Some(entry) = self.overrides.get(seq) {
                        merge_into(&mut merged, &entry.value.value);
                    }
                }
                Some(merged)
            }
        }
    }
}

/// In-memory implementation of [`ComponentStore`].
#[derive(Debug, Default)]
pub struct InMemoryComponentStore {
    state: RwLock<StoreState>,
}

impl InMemoryComponentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ComponentStore for InMemoryComponentStore {
    fn get(&self, component: &str, entity: EntityId) -> Result<Option<Record>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("components.get"))?;
        Ok(state.resolve(&(component.to_string(), entity)))
    }

    fn get_base(&self, component: &str, entity: EntityId) -> Result<Option<Record>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("components.get_base"))?;
        Ok(state.base.get(&(component.to_string(), entity)).cloned())
    }

    fn set(&self, component: &str, entity: EntityId, value: Record) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("components.set"))?;
        state.base.insert((component.to_string(), entity), value);
        Ok(())
    }

    fn update(&self, component: &str, entity: EntityId, partial: Record) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("components.update"))?;
        let base = state.base.entry((component.to_string(), entity)).or_default();
        merge_into(base, &partial);
        Ok(())
    }

    fn remove(&self, component: &str, entity: EntityId) -> Result<bool, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("components.remove"))?;
        Ok(state.base.remove(&(component.to_string(), entity)).is_some())
    }

    fn add_override(&self, tag: OverrideTag, value: Override) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("components.add_override"))?;
        let seq = state.next_seq;
        state.next_seq += 1;

        let key = (value.component.clone(), value.entity);
        state.by_key.entry(key).or_default().push(seq);
        state.overrides.insert(seq, OverrideEntry { tag, value });
        Ok(())
    }

    fn remove_override(&self, tag: OverrideTag) -> Result<usize, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("components.remove_override"))?;

        let doomed: Vec<u64> = state
            .overrides
            .iter()
            .filter(|(_, entry)| entry.tag == tag)
            .map(|(seq, _)| *seq)
            .collect();

        for seq in &doomed {
            let Some(entry) = state.overrides.remove(seq) else {
                continue;
            };
            let key = (entry.value.component, entry.value.entity);
            if let Some(seqs) = state.by_key.get_mut(&key) {
                seqs.retain(|s| s != seq);
                if seqs.is_empty() {
                    state.by_key.remove(&key);
                }
            }
        }

        trace!(%tag, removed = doomed.len(), "overrides removed");
        Ok(doomed.len())
    }

    fn overrides(&self, tag: OverrideTag) -> Result<Vec<Override>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("components.overrides"))?;
        Ok(state
            .overrides
            .values()
            .filter(|entry| entry.tag == tag)
            .map(|entry| entry.value.clone())
            .collect())
    }

    fn override_count(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("components.override_count"))?;
        Ok(state.overrides.len())
    }

    fn entities(&self, component: &str) -> Result<Vec<EntityId>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("components.entities"))?;
        let mut out: Vec<EntityId> = state
            .base
            .keys()
            .filter(|(name, _)| name == component)
            .map(|(_, entity)| *entity)
            .collect();
        out.sort();
        Ok(out)
    }
}
