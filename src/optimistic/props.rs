//! Argument records of the game's state-changing actions.

use serde::{Deserialize, Serialize};

/// Create a fungible order trading `maker_*` resources for `taker_*` ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MakeFungibleOrderProps {
    /// Realm entity making the order.
    pub maker_id: u64,
    /// Resource types offered, parallel to `maker_quantities`.
    pub maker_entity_types: Vec<u8>,
    /// Amounts offered.
    pub maker_quantities: Vec<u64>,
    /// Realm entity allowed to take the order (0 for anyone).
    pub taker_id: u64,
    /// Resource types requested, parallel to `taker_quantities`.
    pub taker_entity_types: Vec<u8>,
    /// Amounts requested.
    pub taker_quantities: Vec<u64>,
}

/// Claim the resources of a settled trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFungibleOrderProps {
    /// Realm claiming (either the maker or the taker).
    pub entity_id: u64,
    #[allow(missing_docs)]
    pub trade_id: u64,
}

/// Accept an open order as taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOrderProps {
    /// Realm taking the order.
    pub taker_id: u64,
    #[allow(missing_docs)]
    pub trade_id: u64,
}

/// Change the status of an order the caller made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOrderStatusProps {
    #[allow(missing_docs)]
    pub realm_id: u64,
    #[allow(missing_docs)]
    pub trade_id: u64,
}

/// Buy labor for one resource of a realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLaborProps {
    #[allow(missing_docs)]
    pub realm_id: u64,
    #[allow(missing_docs)]
    pub resource_type: u8,
    /// Labor units bought.
    pub labor_units: u64,
    /// Production multiplier.
    pub multiplier: u64,
}

/// Harvest accumulated labor for one resource of a realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestLaborProps {
    #[allow(missing_docs)]
    pub realm_id: u64,
    #[allow(missing_docs)]
    pub resource_type: u8,
}

/// An amount of one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAmount {
    #[allow(missing_docs)]
    pub resource_id: u8,
    #[allow(missing_docs)]
    pub amount: u64,
}
