//! Abstract component store contract.
//!
//! A store maps `(component type, entity id)` to a field record and supports
//! tagged overrides: partial records layered over the authoritative value
//! until their tag is removed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::Component;
use crate::entity::EntityId;
use crate::overlay::OverrideTag;
use crate::value::Record;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// A partial value layered on top of one component of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    /// Component type name.
    pub component: String,
    /// Target entity.
    pub entity: EntityId,
    /// Fields to show instead of the base value.
    pub value: Record,
}

impl Override {
    /// Creates an override.
    #[must_use]
    pub fn new(component: impl Into<String>, entity: EntityId, value: Record) -> Self {
        Self {
            component: component.into(),
            entity,
            value,
        }
    }
}

/// Storage trait for component records.
///
/// # Override semantics
/// - `get` returns the base value merged with every override on that key, in
///   the order the overrides were added (later writes win per field).
/// - Several tags may target the same key at once.
/// - `remove_override` drops every override written under a tag, across all
///   component types.
pub trait ComponentStore: Send + Sync {
    /// Resolved value (base plus overrides).
    fn get(&self, component: &str, entity: EntityId) -> Result<Option<Record>, StorageError>;

    /// Authoritative value only.
    fn get_base(&self, component: &str, entity: EntityId) -> Result<Option<Record>, StorageError>;

    /// Replaces the authoritative value.
    fn set(&self, component: &str, entity: EntityId, value: Record) -> Result<(), StorageError>;

    /// Merges `partial` field-wise into the authoritative value.
    fn update(&self, component: &str, entity: EntityId, partial: Record) -> Result<(), StorageError>;

    /// Deletes the authoritative value. Returns true if one existed.
    fn remove(&self, component: &str, entity: EntityId) -> Result<bool, StorageError>;

    /// Layers `value` under `tag`.
    fn add_override(&self, tag: OverrideTag, value: Override) -> Result<(), StorageError>;

    /// Removes every override written under `tag`; returns how many were removed.
    fn remove_override(&self, tag: OverrideTag) -> Result<usize, StorageError>;

    /// Overrides currently held under `tag`, in application order.
    fn overrides(&self, tag: OverrideTag) -> Result<Vec<Override>, StorageError>;

    /// Total number of live overrides.
    fn override_count(&self) -> Result<usize, StorageError>;

    /// Entities holding a base value for `component`.
    fn entities(&self, component: &str) -> Result<Vec<EntityId>, StorageError>;
}

/// Typed accessors for any [`ComponentStore`].
pub trait ComponentStoreExt: ComponentStore {
    /// Resolved typed value.
    fn get_component<C: Component>(&self, entity: EntityId) -> Result<Option<C>, StorageError> {
        self.get(C::NAME, entity)?.map(C::from_record).transpose()
    }

    /// Authoritative typed value.
    fn get_base_component<C: Component>(&self, entity: EntityId) -> Result<Option<C>, StorageError> {
        self.get_base(C::NAME, entity)?.map(C::from_record).transpose()
    }

    /// Replaces the authoritative typed value.
    fn set_component<C: Component>(&self, entity: EntityId, value: &C) -> Result<(), StorageError> {
        self.set(C::NAME, entity, value.to_record()?)
    }
}

impl<T: ComponentStore + ?Sized> ComponentStoreExt for T {}
