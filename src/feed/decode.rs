//! Decoding of notification and query payloads, and merging into the store.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::entity::{parse_keys, EntityId, EntityKey};
use crate::error::{DecodeError, MirrorError};
use crate::schema::SchemaRegistry;
use crate::storage::ComponentStore;
use crate::value::{project, Record};

/// Entity id as sent by the indexer: a single string or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdList {
    #[allow(missing_docs)]
    One(String),
    #[allow(missing_docs)]
    Many(Vec<String>),
}

impl IdList {
    /// The id in the list form the point query expects.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(id) => vec![id.clone()],
            Self::Many(ids) => ids.clone(),
        }
    }
}

/// One `entityUpdated` push message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdated {
    #[allow(missing_docs)]
    pub id: IdList,
    /// Key sequence of the changed entity.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Comma-joined names of the components that changed.
    pub component_names: String,
}

impl EntityUpdated {
    /// Changed component names, in notification order.
    #[must_use]
    pub fn component_names(&self) -> Vec<String> {
        split_component_names(&self.component_names)
    }
}

/// Splits a comma-joined component name list. Blank segments are dropped.
#[must_use]
pub fn split_component_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decodes the `data` object of an `entityUpdated` message.
pub fn decode_notification(data: &Value) -> Result<EntityUpdated, DecodeError> {
    let payload = data.get("entityUpdated").ok_or_else(|| DecodeError::MissingField {
        path: "entityUpdated".to_string(),
    })?;
    Ok(EntityUpdated::deserialize(payload)?)
}

/// A component value tagged with its type name.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentData {
    /// Component type (`__typename`).
    pub typename: String,
    /// Field values, without `__typename`.
    pub fields: Record,
}

impl ComponentData {
    /// Reads a `components` entry. `path` locates it in error messages.
    pub fn from_value(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let obj = value.as_object().ok_or_else(|| DecodeError::UnexpectedShape {
            path: path.to_string(),
            message: "component is not an object".to_string(),
        })?;
        let typename = obj
            .get("__typename")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::MissingField {
                path: format!("{path}.__typename"),
            })?
            .to_string();

        let mut fields = obj.clone();
        fields.remove("__typename");
        Ok(Self { typename, fields })
    }
}

/// An entity with its resolved components.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityNode {
    /// Parsed key sequence.
    pub keys: Vec<EntityKey>,
    /// Components present on the entity, as reported by a bulk query.
    pub component_names: Vec<String>,
    /// Component values returned by the query.
    pub components: Vec<ComponentData>,
}

impl EntityNode {
    /// Decodes an `entity` or `edges[].node` object.
    pub fn from_value(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let obj = value.as_object().ok_or_else(|| DecodeError::UnexpectedShape {
            path: path.to_string(),
            message: "entity is not an object".to_string(),
        })?;

        let raw_keys = obj
            .get("keys")
            .and_then(Value::as_array)
            .ok_or_else(|| DecodeError::MissingField {
                path: format!("{path}.keys"),
            })?;
        let mut key_strings = Vec::with_capacity(raw_keys.len());
        for (i, key) in raw_keys.iter().enumerate() {
            let key = key.as_str().ok_or_else(|| DecodeError::UnexpectedShape {
                path: format!("{path}.keys[{i}]"),
                message: "key is not a string".to_string(),
            })?;
            key_strings.push(key);
        }
        let keys = parse_keys(&key_strings)?;

        let component_names = obj
            .get("componentNames")
            .and_then(Value::as_str)
            .map(split_component_names)
            .unwrap_or_default();

        let mut components = Vec::new();
        if let Some(raw) = obj.get("components") {
            let list = match raw {
                Value::Null => &[][..],
                Value::Array(list) => list.as_slice(),
                _ => {
                    return Err(DecodeError::UnexpectedShape {
                        path: format!("{path}.components"),
                        message: "components is not a list".to_string(),
                    })
                }
            };
            for (i, item) in list.iter().enumerate() {
                if item.is_null() {
                    continue;
                }
                components.push(ComponentData::from_value(item, &format!("{path}.components[{i}]"))?);
            }
        }

        Ok(Self {
            keys,
            component_names,
            components,
        })
    }

    /// Store id of the entity.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        EntityId::from_keys(&self.keys)
    }

    /// The component of type `name`, if the query returned one.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentData> {
        self.components.iter().find(|c| c.typename == name)
    }
}

/// Decodes the `data` object of an entity point query.
pub fn decode_entity_response(data: &Value) -> Result<EntityNode, DecodeError> {
    match data.get("entity") {
        None | Some(Value::Null) => Err(DecodeError::MissingField {
            path: "entity".to_string(),
        }),
        Some(entity) => EntityNode::from_value(entity, "entity"),
    }
}

/// Decodes the `data` object of a bulk query, one result per edge.
pub fn decode_entities_response(data: &Value) -> Result<Vec<Result<EntityNode, DecodeError>>, DecodeError> {
    let edges = data
        .get("entities")
        .and_then(|e| e.get("edges"))
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::MissingField {
            path: "entities.edges".to_string(),
        })?;

    Ok(edges
        .iter()
        .enumerate()
        .map(|(i, edge)| {
            let path = format!("entities.edges[{i}].node");
            let node = edge.get("node").ok_or_else(|| DecodeError::MissingField { path: path.clone() })?;
            EntityNode::from_value(node, &path)
        })
        .collect())
}

/// Writes the components `names` of `node` into the store as authoritative
/// values. Returns the entity's store id.
///
/// Every name must be registered; names the query returned no value for are
/// skipped. Values are projected onto the registered field list.
pub fn merge_entity<S: AsRef<str>>(
    store: &dyn ComponentStore,
    schema: &SchemaRegistry,
    node: &EntityNode,
    names: &[S],
) -> Result<EntityId, MirrorError> {
    let entity = node.entity_id();

    for name in names {
        let name = name.as_ref();
        let fields = schema.fields(name).map_err(|_| DecodeError::UnknownComponent {
            typename: name.to_string(),
        })?;

        match node.component(name) {
            Some(data) => store.set(name, entity, project(&data.fields, fields))?,
            None => debug!(component = name, entity = %entity, "component missing from response"),
        }
    }
    Ok(entity)
}
