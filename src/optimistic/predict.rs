//! Pure prediction arithmetic.
//!
//! These functions mirror the contracts' state transitions closely enough for
//! display; they never touch the store. Arithmetic saturates instead of
//! wrapping.

use crate::component::{FungibleEntities, Labor, OrderResource, Status, Trade, TradeStatus};
use crate::config::{LaborConfig, OptimisticConfig};

use super::props::{BuildLaborProps, MakeFungibleOrderProps};

/// One predicted resource line of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    /// `[order_id, fungible_key, index]`.
    pub keys: [u64; 3],
    #[allow(missing_docs)]
    pub resource: OrderResource,
}

/// A fabricated order living in the reserved placeholder id range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderOrder {
    /// Key of the trade entity.
    pub trade_id: u64,
    #[allow(missing_docs)]
    pub trade: Trade,
    #[allow(missing_docs)]
    pub status: Status,
    /// Maker order id and its header.
    pub maker_order: (u64, FungibleEntities),
    /// Taker order id and its header.
    pub taker_order: (u64, FungibleEntities),
    /// Maker lines first, then taker lines.
    pub lines: Vec<OrderLine>,
}

/// Fabricates the trade a `make_fungible_order` call is about to create.
///
/// The real ids are unknown until the transaction lands, so the trade, both
/// orders and the fungible key take consecutive ids from
/// `config.placeholder_base_id`.
#[must_use]
pub fn placeholder_order(props: &MakeFungibleOrderProps, now: u64, config: &OptimisticConfig) -> PlaceholderOrder {
    let base = config.placeholder_base_id;
    let trade_id = base;
    let maker_order_id = base.saturating_add(1);
    let taker_order_id = base.saturating_add(2);
    let key = base.saturating_add(3);

    let trade = Trade {
        maker_id: props.maker_id,
        taker_id: 0,
        maker_order_id,
        taker_order_id,
        expires_at: now.saturating_add(config.order_expiry_secs),
        claimed_by_maker: false,
        claimed_by_taker: false,
        taker_needs_caravan: true,
    };

    let mut lines = order_lines(maker_order_id, key, &props.maker_entity_types, &props.maker_quantities);
    lines.extend(order_lines(taker_order_id, key, &props.taker_entity_types, &props.taker_quantities));

    PlaceholderOrder {
        trade_id,
        trade,
        status: Status::from(TradeStatus::Open),
        maker_order: (
            maker_order_id,
            FungibleEntities {
                key,
                count: props.maker_quantities.len() as u64,
            },
        ),
        taker_order: (
            taker_order_id,
            FungibleEntities {
                key,
                count: props.taker_quantities.len() as u64,
            },
        ),
        lines,
    }
}

fn order_lines(order_id: u64, key: u64, types: &[u8], quantities: &[u64]) -> Vec<OrderLine> {
    quantities
        .iter()
        .enumerate()
        .map(|(i, &balance)| OrderLine {
            keys: [order_id, key, i as u64],
            resource: OrderResource {
                resource_type: types.get(i).copied().unwrap_or_default(),
                balance,
            },
        })
        .collect()
}

/// Resources spent buying `labor_units` at `multiplier` for one cost line.
#[must_use]
pub const fn labor_cost(labor_units: u64, multiplier: u64, unit_cost: u64) -> u64 {
    labor_units.saturating_mul(multiplier).saturating_mul(unit_cost)
}

/// Labor state after buying labor.
///
/// The last harvest timestamp is carried forward unchanged.
#[must_use]
pub fn predict_build(current: &Labor, props: &BuildLaborProps, config: &LaborConfig) -> Labor {
    Labor {
        balance: current
            .balance
            .saturating_add(props.labor_units.saturating_mul(config.base_labor_units)),
        last_harvest: current.last_harvest,
        multiplier: props.multiplier,
    }
}

/// Outcome of harvesting labor at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestPrediction {
    /// Labor state after the harvest.
    pub labor: Labor,
    /// Whole cycles converted into resources.
    pub cycles: u64,
    /// Resources produced by the harvest.
    pub produced: u64,
    /// Resource balance after crediting `produced`.
    pub resource_balance: u64,
}

/// Predicts a harvest at `ts`.
///
/// Only labor accumulated up to `ts` is harvested; whole cycles become
/// resources, the partial-cycle remainder and any labor bought beyond `ts`
/// stay banked in the new balance.
#[must_use]
pub fn predict_harvest(
    labor: &Labor,
    ts: u64,
    resource_type: u8,
    current_balance: u64,
    config: &LaborConfig,
) -> HarvestPrediction {
    let (generated, unharvested) = if labor.balance <= ts {
        (labor.balance.saturating_sub(labor.last_harvest), 0)
    } else {
        (ts.saturating_sub(labor.last_harvest), labor.balance - ts)
    };

    let units = config.base_labor_units.max(1);
    let cycles = generated / units;
    let remainder = generated - cycles * units;
    let balance = ts.saturating_add(remainder).saturating_add(unharvested);

    let produced = if config.is_food(resource_type) {
        cycles
            .saturating_mul(config.base_food_per_cycle)
            .saturating_mul(labor.multiplier)
    } else {
        cycles.saturating_mul(config.base_resources_per_cycle)
    };

    HarvestPrediction {
        labor: Labor {
            balance,
            last_harvest: ts,
            multiplier: labor.multiplier,
        },
        cycles,
        produced,
        resource_balance: current_balance.saturating_add(produced),
    }
}
