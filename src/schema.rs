//! Component schema registry.
//!
//! Query documents are assembled from the field lists registered here. The
//! registry is plain data: component-type name to ordered field names.

use std::collections::HashMap;

use crate::component::{
    ArrivalTime, Capacity, Caravan, Component, FungibleEntities, Labor, MetaData, OrderResource,
    Owner, Position, Quantity, Realm, Resource, Status, Trade,
};
use crate::error::SchemaError;

/// Field layout of a single component type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSchema {
    /// Component type name.
    pub name: String,
    /// Field names in declaration order.
    pub fields: Vec<String>,
}

/// Registry of every component type the client knows about.
///
/// Iteration follows registration order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: Vec<ComponentSchema>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in game component.
    #[must_use]
    pub fn eternum() -> Self {
        let mut registry = Self::new();
        registry.register_builtin::<Realm>();
        registry.register_builtin::<Owner>();
        registry.register_builtin::<MetaData>();
        registry.register_builtin::<Position>();
        registry.register_builtin::<Resource>();
        registry.register_builtin::<Labor>();
        registry.register_builtin::<Trade>();
        registry.register_builtin::<Status>();
        registry.register_builtin::<FungibleEntities>();
        registry.register_builtin::<OrderResource>();
        registry.register_builtin::<Caravan>();
        registry.register_builtin::<Quantity>();
        registry.register_builtin::<Capacity>();
        registry.register_builtin::<ArrivalTime>();
        registry
    }

    fn register_builtin<C: Component>(&mut self) {
        // Built-in names are unique and non-empty.
        let _ = self.register_component::<C>();
    }

    /// Registers a component type by name.
    pub fn register<I, S>(&mut self, name: impl Into<String>, fields: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(SchemaError::DuplicateComponent { name });
        }

        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(SchemaError::EmptyFieldList { name });
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(ComponentSchema { name, fields });
        Ok(())
    }

    /// Registers a typed component.
    pub fn register_component<C: Component>(&mut self) -> Result<(), SchemaError> {
        self.register(C::NAME, C::FIELDS.iter().copied())
    }

    /// Looks up a component's schema.
    pub fn get(&self, name: &str) -> Result<&ComponentSchema, SchemaError> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| SchemaError::UnknownComponent {
                name: name.to_string(),
            })
    }

    /// Field names of a component.
    pub fn fields(&self, name: &str) -> Result<&[String], SchemaError> {
        self.get(name).map(|s| s.fields.as_slice())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered component names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
