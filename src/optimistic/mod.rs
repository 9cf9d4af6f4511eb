//! Optimistic wrappers around the game's state-changing actions.
//!
//! Each wrapper predicts the action's effect, layers the prediction over the
//! store under a fresh tag, issues the real action and removes the tag once
//! the action settles. The real action's result is returned unchanged.

mod predict;
mod props;
mod system_calls;

pub use predict::{
    labor_cost, placeholder_order, predict_build, predict_harvest, HarvestPrediction, OrderLine, PlaceholderOrder,
};
pub use props::{
    AcceptOrderProps, BuildLaborProps, ChangeOrderStatusProps, ClaimFungibleOrderProps, HarvestLaborProps,
    MakeFungibleOrderProps, ResourceAmount,
};
pub use system_calls::SystemCalls;

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::component::{Labor, Resource, Status, Trade, TradeStatus};
use crate::config::OptimisticConfig;
use crate::entity::EntityId;
use crate::error::{ActionError, ValidationError};
use crate::overlay::{run_optimistic, OverlayScope};
use crate::storage::{ComponentStore, ComponentStoreExt, StorageError};
use crate::time::{Clock, SystemClock};
use crate::value::record;

/// Wraps a [`SystemCalls`] implementation with optimistic predictions.
pub struct OptimisticSystemCalls<S> {
    store: Arc<dyn ComponentStore>,
    calls: S,
    config: OptimisticConfig,
    clock: Arc<dyn Clock>,
}

impl<S: SystemCalls> OptimisticSystemCalls<S> {
    /// Wraps `calls` with the default configuration and the wall clock.
    pub fn new(store: Arc<dyn ComponentStore>, calls: S) -> Self {
        Self {
            store,
            calls,
            config: OptimisticConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Wraps `calls` with a custom configuration.
    pub fn with_config(store: Arc<dyn ComponentStore>, calls: S, config: OptimisticConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            store,
            calls,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the time source used for order expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The wrapped real actions.
    pub fn inner(&self) -> &S {
        &self.calls
    }

    pub fn store(&self) -> &Arc<dyn ComponentStore> {
        &self.store
    }

    pub fn config(&self) -> &OptimisticConfig {
        &self.config
    }

    /// Makes an order, showing a placeholder trade until it lands.
    ///
    /// Returns the real trade id.
    pub async fn make_fungible_order(&self, props: MakeFungibleOrderProps) -> Result<u64, ActionError> {
        let order = placeholder_order(&props, self.clock.now_secs(), &self.config);

        run_optimistic(
            &self.store,
            |scope| {
                let trade_entity = EntityId::from_ids(&[order.trade_id]);
                scope.apply_component(trade_entity, &order.trade)?;
                scope.apply_component(trade_entity, &order.status)?;

                let (maker_order_id, maker_header) = &order.maker_order;
                scope.apply_component(EntityId::from_ids(&[*maker_order_id]), maker_header)?;
                let (taker_order_id, taker_header) = &order.taker_order;
                scope.apply_component(EntityId::from_ids(&[*taker_order_id]), taker_header)?;

                for line in &order.lines {
                    scope.apply_component(EntityId::from_ids(&line.keys), &line.resource)?;
                }
                debug!(tag = %scope.tag(), trade_id = order.trade_id, lines = order.lines.len(), "placeholder order predicted");
                Ok(())
            },
            self.calls.make_fungible_order(props),
        )
        .await
    }

    /// Claims a trade, crediting `resources` to the caller ahead of time.
    pub async fn claim_fungible_order(
        &self,
        resources: &[ResourceAmount],
        props: ClaimFungibleOrderProps,
    ) -> Result<(), ActionError> {
        run_optimistic(
            &self.store,
            |scope| predict_claim(scope, resources, props),
            self.calls.claim_fungible_order(props),
        )
        .await
    }

    /// Accepts an order as taker.
    pub async fn accept_order(&self, props: AcceptOrderProps) -> Result<(), ActionError> {
        run_optimistic(
            &self.store,
            |scope| {
                let trade_entity = EntityId::from_ids(&[props.trade_id]);
                scope.apply_component(trade_entity, &Status::from(TradeStatus::Accepted))?;
                scope.apply_fields::<Trade>(trade_entity, record([("taker_id", json!(props.taker_id))]))
            },
            self.calls.accept_order(props),
        )
        .await
    }

    /// Cancels an order the caller made.
    pub async fn cancel_fungible_order(&self, props: ChangeOrderStatusProps) -> Result<(), ActionError> {
        run_optimistic(
            &self.store,
            |scope| {
                scope.apply_component(
                    EntityId::from_ids(&[props.trade_id]),
                    &Status::from(TradeStatus::Cancelled),
                )
            },
            self.calls.cancel_fungible_order(props),
        )
        .await
    }

    /// Buys labor at `ts`, deducting its cost from the realm's resources.
    pub async fn build_labor(&self, ts: u64, props: BuildLaborProps) -> Result<(), ActionError> {
        run_optimistic(
            &self.store,
            |scope| predict_build_labor(scope, &self.config, ts, props),
            self.calls.build_labor(props),
        )
        .await
    }

    /// Harvests labor at `ts`, crediting the produced resources.
    pub async fn harvest_labor(&self, ts: u64, props: HarvestLaborProps) -> Result<(), ActionError> {
        run_optimistic(
            &self.store,
            |scope| predict_harvest_labor(scope, &self.config, ts, props),
            self.calls.harvest_labor(props),
        )
        .await
    }
}

fn predict_claim(
    scope: &mut OverlayScope,
    resources: &[ResourceAmount],
    props: ClaimFungibleOrderProps,
) -> Result<(), StorageError> {
    let trade_entity = EntityId::from_ids(&[props.trade_id]);
    let trade = scope.store().get_component::<Trade>(trade_entity)?;

    let claimed_field = match trade {
        Some(t) if t.maker_id == props.entity_id => "claimed_by_maker",
        _ => "claimed_by_taker",
    };
    scope.apply_fields::<Trade>(trade_entity, record([(claimed_field, json!(true))]))?;

    for amount in resources {
        let entity = EntityId::from_ids(&[props.entity_id, u64::from(amount.resource_id)]);
        let current = resource_balance(scope, entity)?;
        scope.apply_component(
            entity,
            &Resource {
                resource_type: amount.resource_id,
                balance: current.saturating_add(amount.amount),
            },
        )?;
    }
    Ok(())
}

fn predict_build_labor(
    scope: &mut OverlayScope,
    config: &OptimisticConfig,
    ts: u64,
    props: BuildLaborProps,
) -> Result<(), StorageError> {
    for cost in &config.labor.cost_resources {
        let entity = EntityId::from_ids(&[props.realm_id, u64::from(cost.resource_id)]);
        let current = resource_balance(scope, entity)?;
        let spent = labor_cost(props.labor_units, props.multiplier, cost.amount);
        scope.apply_component(
            entity,
            &Resource {
                resource_type: cost.resource_id,
                balance: current.saturating_sub(spent),
            },
        )?;
    }

    let labor_entity = EntityId::from_ids(&[props.realm_id, u64::from(props.resource_type)]);
    let current = scope
        .store()
        .get_component::<Labor>(labor_entity)?
        .unwrap_or_else(|| Labor::fresh(ts));
    scope.apply_component(labor_entity, &predict_build(&current, &props, &config.labor))
}

fn predict_harvest_labor(
    scope: &mut OverlayScope,
    config: &OptimisticConfig,
    ts: u64,
    props: HarvestLaborProps,
) -> Result<(), StorageError> {
    let entity = EntityId::from_ids(&[props.realm_id, u64::from(props.resource_type)]);
    let labor = scope
        .store()
        .get_component::<Labor>(entity)?
        .unwrap_or_else(|| Labor::fresh(ts));
    let balance = resource_balance(scope, entity)?;

    let prediction = predict_harvest(&labor, ts, props.resource_type, balance, &config.labor);
    scope.apply_component(entity, &prediction.labor)?;
    scope.apply_component(
        entity,
        &Resource {
            resource_type: props.resource_type,
            balance: prediction.resource_balance,
        },
    )
}

fn resource_balance(scope: &OverlayScope, entity: EntityId) -> Result<u64, StorageError> {
    Ok(scope
        .store()
        .get_component::<Resource>(entity)?
        .map_or(0, |r| r.balance))
}

impl<S> fmt::Debug for OptimisticSystemCalls<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticSystemCalls")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::component::{FungibleEntities, OrderResource};
    use crate::storage::InMemoryComponentStore;
    use crate::time::FixedClock;

    /// Real-action double that records what the store showed mid-flight.
    struct Recorder {
        store: Arc<dyn ComponentStore>,
        observed: Mutex<Vec<(String, usize)>>,
        fail_with: Option<ActionError>,
    }

    impl Recorder {
        fn new(store: &Arc<dyn ComponentStore>) -> Self {
            Self {
                store: Arc::clone(store),
                observed: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(store: &Arc<dyn ComponentStore>, err: ActionError) -> Self {
            Self {
                fail_with: Some(err),
                ..Self::new(store)
            }
        }

        fn observe(&self, action: &str) -> Result<(), ActionError> {
            let live = self.store.override_count().unwrap();
            self.observed.lock().unwrap().push((action.to_string(), live));
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn observed(&self) -> Vec<(String, usize)> {
            self.observed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SystemCalls for Recorder {
        async fn make_fungible_order(&self, _props: MakeFungibleOrderProps) -> Result<u64, ActionError> {
            self.observe("make").map(|()| 42)
        }

        async fn claim_fungible_order(&self, _props: ClaimFungibleOrderProps) -> Result<(), ActionError> {
            self.observe("claim")
        }

        async fn accept_order(&self, _props: AcceptOrderProps) -> Result<(), ActionError> {
            self.observe("accept")
        }

        async fn cancel_fungible_order(&self, _props: ChangeOrderStatusProps) -> Result<(), ActionError> {
            self.observe("cancel")
        }

        async fn build_labor(&self, _props: BuildLaborProps) -> Result<(), ActionError> {
            self.observe("build")
        }

        async fn harvest_labor(&self, _props: HarvestLaborProps) -> Result<(), ActionError> {
            self.observe("harvest")
        }
    }

    fn store() -> Arc<dyn ComponentStore> {
        Arc::new(InMemoryComponentStore::new())
    }

    #[tokio::test]
    async fn test_make_order_writes_placeholder_then_clears() {
        let store = store();
        let calls = OptimisticSystemCalls::new(Arc::clone(&store), Recorder::new(&store))
            .with_clock(Arc::new(FixedClock::new(1_000)));

        let id = calls
            .make_fungible_order(MakeFungibleOrderProps {
                maker_id: 7,
                maker_entity_types: vec![1, 2],
                maker_quantities: vec![5, 3],
                taker_id: 0,
                taker_entity_types: vec![3],
                taker_quantities: vec![2],
            })
            .await
            .unwrap();

        assert_eq!(id, 42);
        // trade + status + two headers + three lines
        assert_eq!(calls.inner().observed(), vec![("make".to_string(), 7)]);
        assert_eq!(store.override_count().unwrap(), 0);
        assert!(store
            .get_component::<Trade>(EntityId::from_ids(&[9_999_999_999]))
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_make_order_placeholder_values() {
        let store = store();
        let order = placeholder_order(
            &MakeFungibleOrderProps {
                maker_id: 7,
                maker_entity_types: vec![1],
                maker_quantities: vec![5],
                taker_id: 0,
                taker_entity_types: vec![3],
                taker_quantities: vec![2],
            },
            1_000,
            &OptimisticConfig::default(),
        );
        let mut scope = OverlayScope::new(Arc::clone(&store));
        scope
            .apply_component(EntityId::from_ids(&[order.maker_order.0]), &order.maker_order.1)
            .unwrap();
        scope
            .apply_component(EntityId::from_ids(&order.lines[0].keys), &order.lines[0].resource)
            .unwrap();

        let header = store
            .get_component::<FungibleEntities>(EntityId::from_ids(&[10_000_000_000]))
            .unwrap()
            .unwrap();
        assert_eq!(header, FungibleEntities { key: 10_000_000_002, count: 1 });
        let line = store
            .get_component::<OrderResource>(EntityId::from_ids(&[10_000_000_000, 10_000_000_002, 0]))
            .unwrap()
            .unwrap();
        assert_eq!(line.balance, 5);
    }

    #[tokio::test]
    async fn test_failed_action_propagates_and_clears() {
        let store = store();
        let err = ActionError::Reverted {
            reason: "not maker".to_string(),
        };
        let calls = OptimisticSystemCalls::new(Arc::clone(&store), Recorder::failing(&store, err.clone()));

        let out = calls
            .cancel_fungible_order(ChangeOrderStatusProps {
                realm_id: 1,
                trade_id: 5,
            })
            .await;

        assert_eq!(out.unwrap_err(), err);
        assert_eq!(calls.inner().observed(), vec![("cancel".to_string(), 1)]);
        assert_eq!(store.override_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_accept_overlays_status_and_taker() {
        let store = store();
        let trade_entity = EntityId::from_ids(&[5]);
        store
            .set_component(
                trade_entity,
                &Trade {
                    maker_id: 1,
                    ..Trade::default()
                },
            )
            .unwrap();
        let calls = OptimisticSystemCalls::new(Arc::clone(&store), Recorder::new(&store));

        calls
            .accept_order(AcceptOrderProps {
                taker_id: 9,
                trade_id: 5,
            })
            .await
            .unwrap();

        assert_eq!(calls.inner().observed(), vec![("accept".to_string(), 2)]);
        let trade = store.get_component::<Trade>(trade_entity).unwrap().unwrap();
        assert_eq!(trade.taker_id, 0);
        assert_eq!(trade.maker_id, 1);
    }

    #[tokio::test]
    async fn test_build_labor_deducts_costs_and_saturates() {
        let store = store();
        let realm = 3;
        store
            .set_component(
                EntityId::from_ids(&[realm, 2]),
                &Resource {
                    resource_type: 2,
                    balance: 1_000,
                },
            )
            .unwrap();
        store
            .set_component(
                EntityId::from_ids(&[realm, 3]),
                &Resource {
                    resource_type: 3,
                    balance: 15,
                },
            )
            .unwrap();

        let mut scope = OverlayScope::new(Arc::clone(&store));
        let props = BuildLaborProps {
            realm_id: realm,
            resource_type: 1,
            labor_units: 2,
            multiplier: 3,
        };
        predict_build_labor(&mut scope, &OptimisticConfig::default(), 500, props).unwrap();

        let wood = store
            .get_component::<Resource>(EntityId::from_ids(&[realm, 2]))
            .unwrap()
            .unwrap();
        assert_eq!(wood.balance, 1_000 - 60);
        let stone = store
            .get_component::<Resource>(EntityId::from_ids(&[realm, 3]))
            .unwrap()
            .unwrap();
        assert_eq!(stone.balance, 0);
        let labor = store
            .get_component::<Labor>(EntityId::from_ids(&[realm, 1]))
            .unwrap()
            .unwrap();
        assert_eq!(
            labor,
            Labor {
                balance: 500 + 2 * 7_200,
                last_harvest: 500,
                multiplier: 3,
            }
        );

        scope.settle();
        assert_eq!(
            store
                .get_component::<Resource>(EntityId::from_ids(&[realm, 3]))
                .unwrap()
                .unwrap()
                .balance,
            15
        );
    }

    #[tokio::test]
    async fn test_harvest_labor_overlays_labor_and_resource() {
        let store = store();
        let entity = EntityId::from_ids(&[4, 254]);
        store
            .set_component(
                entity,
                &Labor {
                    balance: 7_200 * 2,
                    last_harvest: 0,
                    multiplier: 2,
                },
            )
            .unwrap();

        let mut scope = OverlayScope::new(Arc::clone(&store));
        predict_harvest_labor(
            &mut scope,
            &OptimisticConfig::default(),
            20_000,
            HarvestLaborProps {
                realm_id: 4,
                resource_type: 254,
            },
        )
        .unwrap();

        let food = store.get_component::<Resource>(entity).unwrap().unwrap();
        assert_eq!(food.balance, 2 * 14_000 * 2);
        let labor = store.get_component::<Labor>(entity).unwrap().unwrap();
        assert_eq!(labor.balance, 20_000);
        assert_eq!(labor.last_harvest, 20_000);
    }

    #[test]
    fn test_with_config_validates() {
        let store = store();
        let bad = OptimisticConfig {
            placeholder_base_id: u64::MAX,
            ..OptimisticConfig::default()
        };
        assert!(OptimisticSystemCalls::with_config(Arc::clone(&store), Recorder::new(&store), bad).is_err());
    }
}
