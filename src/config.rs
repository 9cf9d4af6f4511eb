//! Configuration for the optimistic layer and the entity feed.
//!
//! Constants default to the values the game contracts use; every struct can
//! also be deserialized so a client can load them from a config file.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Resource ids whose harvest yield scales with the labor multiplier.
pub const FOOD_RESOURCE_IDS: [u8; 2] = [254, 255];

/// Number of entries kept by the update log.
pub const HISTORY_CAPACITY: usize = 16;

/// Entities fetched by a backfill when no limit is given.
pub const DEFAULT_BACKFILL_PAGE_SIZE: usize = 100;

/// A resource consumed per unit of labor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostResource {
    /// Resource type consumed.
    pub resource_id: u8,
    /// Amount consumed per labor unit and multiplier step.
    pub amount: u64,
}

/// Labor economics used by the build/harvest predictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborConfig {
    /// Food produced per labor cycle (before multiplier).
    pub base_food_per_cycle: u64,
    /// Seconds of labor making up one cycle.
    pub base_labor_units: u64,
    /// Non-food resources produced per labor cycle.
    pub base_resources_per_cycle: u64,
    /// Resources deducted when buying labor.
    pub cost_resources: Vec<CostResource>,
    /// Resource ids treated as food.
    pub food_resource_ids: Vec<u8>,
}

impl Default for LaborConfig {
    fn default() -> Self {
        Self {
            base_food_per_cycle: 14_000,
            base_labor_units: 7_200,
            base_resources_per_cycle: 21,
            cost_resources: vec![
                CostResource {
                    resource_id: 2,
                    amount: 10,
                },
                CostResource {
                    resource_id: 3,
                    amount: 10,
                },
            ],
            food_resource_ids: FOOD_RESOURCE_IDS.to_vec(),
        }
    }
}

impl LaborConfig {
    /// Returns true if `resource_type` is food.
    #[must_use]
    pub fn is_food(&self, resource_type: u8) -> bool {
        self.food_resource_ids.contains(&resource_type)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_labor_units == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "base_labor_units must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for [`OptimisticSystemCalls`](crate::optimistic::OptimisticSystemCalls).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimisticConfig {
    /// Labor economics.
    pub labor: LaborConfig,
    /// Lifetime of a freshly made order, in seconds (about one month).
    pub order_expiry_secs: u64,
    /// First id of the reserved range used for not-yet-known order ids.
    pub placeholder_base_id: u64,
}

impl Default for OptimisticConfig {
    fn default() -> Self {
        Self {
            labor: LaborConfig::default(),
            order_expiry_secs: 2_628_000,
            placeholder_base_id: 9_999_999_999,
        }
    }
}

impl OptimisticConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.labor.validate()?;
        if self.placeholder_base_id.checked_add(3).is_none() {
            return Err(ValidationError::InvalidConfig {
                reason: "placeholder_base_id leaves no room for order ids".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for the entity subscription feed and backfill loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Entries kept by the update log.
    pub history_capacity: usize,
    /// Default page size of the backfill query.
    pub backfill_page_size: usize,
    /// Maximum concurrently running resolution queries.
    pub max_in_flight: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
            backfill_page_size: DEFAULT_BACKFILL_PAGE_SIZE,
            max_in_flight: 64,
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "history_capacity must be > 0".to_string(),
            });
        }
        if self.backfill_page_size == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "backfill_page_size must be > 0".to_string(),
            });
        }
        if self.max_in_flight == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "max_in_flight must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
