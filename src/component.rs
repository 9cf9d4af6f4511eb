//! Typed component records.
//!
//! Components are schema-declared on chain; these structs mirror the ones the
//! client reads or predicts. Every struct defaults missing fields so a partial
//! override layered over an absent base value still decodes.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::entity::Felt;
use crate::storage::StorageError;
use crate::value::{felt, flag, Record};

/// A named field record attached to an entity.
pub trait Component: Serialize + DeserializeOwned + Debug + Clone + Send + Sync + 'static {
    /// Component type name, as used by the indexer (`__typename`).
    const NAME: &'static str;

    /// Field names in declaration order.
    const FIELDS: &'static [&'static str];

    /// Encodes the component as a field record.
    fn to_record(&self) -> Result<Record, StorageError> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(StorageError::Serialization(format!(
                "{} encoded to non-object value: {other}",
                Self::NAME
            ))),
            Err(e) => Err(StorageError::Serialization(format!("{}: {e}", Self::NAME))),
        }
    }

    /// Decodes the component from a field record.
    fn from_record(record: Record) -> Result<Self, StorageError> {
        serde_json::from_value(serde_json::Value::Object(record))
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", Self::NAME)))
    }
}

/// A settlement.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Realm {
    #[serde(with = "felt")]
    pub realm_id: u64,
    #[serde(with = "felt")]
    pub resource_types_packed: u64,
    #[serde(with = "felt")]
    pub resource_types_count: u8,
    #[serde(with = "felt")]
    pub cities: u8,
    #[serde(with = "felt")]
    pub harbors: u8,
    #[serde(with = "felt")]
    pub rivers: u8,
    #[serde(with = "felt")]
    pub regions: u8,
    #[serde(with = "felt")]
    pub wonder: u8,
    #[serde(with = "felt")]
    pub order: u8,
}

impl Component for Realm {
    const NAME: &'static str = "Realm";
    const FIELDS: &'static [&'static str] = &[
        "realm_id",
        "resource_types_packed",
        "resource_types_count",
        "cities",
        "harbors",
        "rivers",
        "regions",
        "wonder",
        "order",
    ];
}

/// Owning account of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owner {
    /// Account address.
    pub address: Felt,
}

impl Component for Owner {
    const NAME: &'static str = "Owner";
    const FIELDS: &'static [&'static str] = &["address"];
}

/// Creation metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaData {
    /// Block timestamp of creation.
    #[serde(with = "felt")]
    pub created_at: u64,
}

impl Component for MetaData {
    const NAME: &'static str = "MetaData";
    const FIELDS: &'static [&'static str] = &["created_at"];
}

/// Map coordinates.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    #[serde(with = "felt")]
    pub x: u64,
    #[serde(with = "felt")]
    pub y: u64,
}

impl Component for Position {
    const NAME: &'static str = "Position";
    const FIELDS: &'static [&'static str] = &["x", "y"];
}

/// Resource balance, keyed by `[entity_id, resource_type]`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    #[serde(with = "felt")]
    pub resource_type: u8,
    #[serde(with = "felt")]
    pub balance: u64,
}

impl Component for Resource {
    const NAME: &'static str = "Resource";
    const FIELDS: &'static [&'static str] = &["resource_type", "balance"];
}

/// Labor state, keyed by `[realm_id, resource_type]`.
///
/// `balance` is a timestamp: labor is accumulated until that point in time.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labor {
    #[serde(with = "felt")]
    pub balance: u64,
    #[serde(with = "felt")]
    pub last_harvest: u64,
    #[serde(with = "felt")]
    pub multiplier: u64,
}

impl Labor {
    /// Fresh labor state at `ts`.
    #[must_use]
    pub const fn fresh(ts: u64) -> Self {
        Self {
            balance: ts,
            last_harvest: ts,
            multiplier: 1,
        }
    }
}

impl Component for Labor {
    const NAME: &'static str = "Labor";
    const FIELDS: &'static [&'static str] = &["balance", "last_harvest", "multiplier"];
}

/// A two-sided trade between a maker and a taker.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trade {
    #[serde(with = "felt")]
    pub maker_id: u64,
    #[serde(with = "felt")]
    pub taker_id: u64,
    #[serde(with = "felt")]
    pub maker_order_id: u64,
    #[serde(with = "felt")]
    pub taker_order_id: u64,
    #[serde(with = "felt")]
    pub expires_at: u64,
    #[serde(with = "flag")]
    pub claimed_by_maker: bool,
    #[serde(with = "flag")]
    pub claimed_by_taker: bool,
    #[serde(with = "flag")]
    pub taker_needs_caravan: bool,
}

impl Component for Trade {
    const NAME: &'static str = "Trade";
    const FIELDS: &'static [&'static str] = &[
        "maker_id",
        "taker_id",
        "maker_order_id",
        "taker_order_id",
        "expires_at",
        "claimed_by_maker",
        "claimed_by_taker",
        "taker_needs_caravan",
    ];
}

/// Trade lifecycle status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    /// One of the [`TradeStatus`] codes.
    #[serde(with = "felt")]
    pub value: u64,
}

impl Component for Status {
    const NAME: &'static str = "Status";
    const FIELDS: &'static [&'static str] = &["value"];
}

/// Status codes stored in [`Status::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum TradeStatus {
    /// Waiting for a taker.
    Open = 0,
    /// A taker accepted the order.
    Accepted = 1,
    /// The maker cancelled the order.
    Cancelled = 2,
}

impl From<TradeStatus> for Status {
    fn from(status: TradeStatus) -> Self {
        Self {
            value: status as u64,
        }
    }
}

/// Header of a fungible order: `count` line items stored under `key`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FungibleEntities {
    #[serde(with = "felt")]
    pub key: u64,
    #[serde(with = "felt")]
    pub count: u64,
}

impl Component for FungibleEntities {
    const NAME: &'static str = "FungibleEntities";
    const FIELDS: &'static [&'static str] = &["key", "count"];
}

/// One resource line of an order, keyed by `[order_id, key, index]`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderResource {
    #[serde(with = "felt")]
    pub resource_type: u8,
    #[serde(with = "felt")]
    pub balance: u64,
}

impl Component for OrderResource {
    const NAME: &'static str = "OrderResource";
    const FIELDS: &'static [&'static str] = &["resource_type", "balance"];
}

/// Caravan attached to an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Caravan {
    #[allow(missing_docs)]
    #[serde(with = "felt")]
    pub caravan_id: u64,
}

impl Component for Caravan {
    const NAME: &'static str = "Caravan";
    const FIELDS: &'static [&'static str] = &["caravan_id"];
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quantity {
    #[serde(with = "felt")]
    pub value: u64,
}

impl Component for Quantity {
    const NAME: &'static str = "Quantity";
    const FIELDS: &'static [&'static str] = &["value"];
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacity {
    #[serde(with = "felt")]
    pub weight_gram: u64,
}

impl Component for Capacity {
    const NAME: &'static str = "Capacity";
    const FIELDS: &'static [&'static str] = &["weight_gram"];
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalTime {
    #[serde(with = "felt")]
    pub arrives_at: u64,
}

impl Component for ArrivalTime {
    const NAME: &'static str = "ArrivalTime";
    const FIELDS: &'static [&'static str] = &["arrives_at"];
}
