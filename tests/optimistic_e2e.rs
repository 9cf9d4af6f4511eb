use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use realmsync::component::{FungibleEntities, Labor, OrderResource, Resource, Status, Trade};
use realmsync::optimistic::{
    AcceptOrderProps, BuildLaborProps, ChangeOrderStatusProps, ClaimFungibleOrderProps, HarvestLaborProps,
    MakeFungibleOrderProps, ResourceAmount,
};
use realmsync::{
    ActionError, ComponentStore, ComponentStoreExt, EntityId, FixedClock, InMemoryComponentStore, OptimisticSystemCalls,
    SystemCalls,
};

/// Real actions that block until released, then succeed or fail.
struct GatedCalls {
    gate: Semaphore,
    gated: bool,
    fail_every: usize,
    calls: AtomicUsize,
}

impl GatedCalls {
    fn open() -> Self {
        Self {
            gate: Semaphore::new(0),
            gated: false,
            fail_every: 0,
            calls: AtomicUsize::new(0),
        }
    }

    fn gated() -> Self {
        Self {
            gated: true,
            ..Self::open()
        }
    }

    fn failing_every(n: usize) -> Self {
        Self {
            fail_every: n,
            ..Self::open()
        }
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    async fn settle(&self) -> Result<(), ActionError> {
        if self.gated {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every != 0 && n % self.fail_every == 0 {
            return Err(ActionError::Reverted {
                reason: format!("call {n} reverted"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SystemCalls for GatedCalls {
    async fn make_fungible_order(&self, _props: MakeFungibleOrderProps) -> Result<u64, ActionError> {
        self.settle().await.map(|()| 77)
    }

    async fn claim_fungible_order(&self, _props: ClaimFungibleOrderProps) -> Result<(), ActionError> {
        self.settle().await
    }

    async fn accept_order(&self, _props: AcceptOrderProps) -> Result<(), ActionError> {
        self.settle().await
    }

    async fn cancel_fungible_order(&self, _props: ChangeOrderStatusProps) -> Result<(), ActionError> {
        self.settle().await
    }

    async fn build_labor(&self, _props: BuildLaborProps) -> Result<(), ActionError> {
        self.settle().await
    }

    async fn harvest_labor(&self, _props: HarvestLaborProps) -> Result<(), ActionError> {
        self.settle().await
    }
}

fn new_store() -> Arc<dyn ComponentStore> {
    Arc::new(InMemoryComponentStore::new())
}

async fn wait_for_overrides(store: &Arc<dyn ComponentStore>, n: usize) {
    while store.override_count().unwrap() < n {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn make_order_shows_placeholder_while_pending() {
    let store = new_store();
    let calls = Arc::new(
        OptimisticSystemCalls::new(Arc::clone(&store), GatedCalls::gated()).with_clock(Arc::new(FixedClock::new(1_000))),
    );

    let pending = tokio::spawn({
        let calls = Arc::clone(&calls);
        async move {
            calls
                .make_fungible_order(MakeFungibleOrderProps {
                    maker_id: 12,
                    maker_entity_types: vec![1, 2],
                    maker_quantities: vec![5, 3],
                    taker_id: 0,
                    taker_entity_types: vec![4],
                    taker_quantities: vec![2],
                })
                .await
        }
    });

    // trade, status, two order headers, three lines
    wait_for_overrides(&store, 7).await;

    let trade_entity = EntityId::from_ids(&[9_999_999_999]);
    let trade = store.get_component::<Trade>(trade_entity).unwrap().unwrap();
    assert_eq!(trade.maker_id, 12);
    assert_eq!(trade.taker_id, 0);
    assert_eq!(trade.maker_order_id, 10_000_000_000);
    assert_eq!(trade.taker_order_id, 10_000_000_001);
    assert_eq!(trade.expires_at, 1_000 + 2_628_000);
    assert!(trade.taker_needs_caravan);
    assert_eq!(store.get_component::<Status>(trade_entity).unwrap().unwrap().value, 0);

    let maker_header = store
        .get_component::<FungibleEntities>(EntityId::from_ids(&[10_000_000_000]))
        .unwrap()
        .unwrap();
    assert_eq!(maker_header.count, 2);

    let lines = [
        ([10_000_000_000, 10_000_000_002, 0], 1, 5),
        ([10_000_000_000, 10_000_000_002, 1], 2, 3),
        ([10_000_000_001, 10_000_000_002, 0], 4, 2),
    ];
    for (keys, resource_type, balance) in lines {
        let line = store
            .get_component::<OrderResource>(EntityId::from_ids(&keys))
            .unwrap()
            .unwrap();
        assert_eq!(line, OrderResource { resource_type, balance });
    }

    calls.inner().release(1);
    assert_eq!(pending.await.unwrap().unwrap(), 77);
    assert_eq!(store.override_count().unwrap(), 0);
    assert!(store.get_component::<Trade>(trade_entity).unwrap().is_none());
}

#[tokio::test]
async fn maker_claim_credits_resources_until_settled() {
    let store = new_store();
    let trade_entity = EntityId::from_ids(&[40]);
    store
        .set_component(
            trade_entity,
            &Trade {
                maker_id: 3,
                taker_id: 8,
                ..Trade::default()
            },
        )
        .unwrap();
    let food = EntityId::from_ids(&[3, 254]);
    store
        .set_component(
            food,
            &Resource {
                resource_type: 254,
                balance: 100,
            },
        )
        .unwrap();

    let calls = Arc::new(OptimisticSystemCalls::new(Arc::clone(&store), GatedCalls::gated()));
    let pending = tokio::spawn({
        let calls = Arc::clone(&calls);
        async move {
            let claimed = [
                ResourceAmount {
                    resource_id: 254,
                    amount: 50,
                },
                ResourceAmount {
                    resource_id: 2,
                    amount: 7,
                },
            ];
            calls
                .claim_fungible_order(
                    &claimed,
                    ClaimFungibleOrderProps {
                        entity_id: 3,
                        trade_id: 40,
                    },
                )
                .await
        }
    });

    wait_for_overrides(&store, 3).await;
    let trade = store.get_component::<Trade>(trade_entity).unwrap().unwrap();
    assert!(trade.claimed_by_maker);
    assert!(!trade.claimed_by_taker);
    assert_eq!(trade.taker_id, 8);
    assert_eq!(store.get_component::<Resource>(food).unwrap().unwrap().balance, 150);
    assert_eq!(
        store
            .get_component::<Resource>(EntityId::from_ids(&[3, 2]))
            .unwrap()
            .unwrap()
            .balance,
        7
    );

    calls.inner().release(1);
    pending.await.unwrap().unwrap();

    assert_eq!(store.override_count().unwrap(), 0);
    assert!(!store.get_component::<Trade>(trade_entity).unwrap().unwrap().claimed_by_maker);
    assert_eq!(store.get_component::<Resource>(food).unwrap().unwrap().balance, 100);
}

#[tokio::test]
async fn no_override_outlives_its_invocation() {
    let store = new_store();
    let calls = Arc::new(OptimisticSystemCalls::new(Arc::clone(&store), GatedCalls::failing_every(3)));

    let mut handles = Vec::new();
    for i in 0..30u64 {
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            match i % 3 {
                0 => calls
                    .cancel_fungible_order(ChangeOrderStatusProps {
                        realm_id: 1,
                        trade_id: i,
                    })
                    .await,
                1 => calls
                    .build_labor(
                        500,
                        BuildLaborProps {
                            realm_id: 1,
                            resource_type: 1,
                            labor_units: 1,
                            multiplier: 1,
                        },
                    )
                    .await,
                _ => calls
                    .harvest_labor(
                        20_000,
                        HarvestLaborProps {
                            realm_id: 1,
                            resource_type: 1,
                        },
                    )
                    .await,
            }
        }));
    }

    let mut failures = 0;
    for handle in handles {
        if handle.await.unwrap().is_err() {
            failures += 1;
        }
    }

    assert_eq!(failures, 10);
    assert_eq!(store.override_count().unwrap(), 0);
    assert!(store.get("Labor", EntityId::from_ids(&[1, 1])).unwrap().is_none());
}

#[tokio::test]
async fn concurrent_predictions_on_one_entity_compose() {
    let store = new_store();
    let entity = EntityId::from_ids(&[6, 1]);
    store
        .set_component(
            entity,
            &Labor {
                balance: 10_000,
                last_harvest: 2_800,
                multiplier: 1,
            },
        )
        .unwrap();

    let calls = Arc::new(OptimisticSystemCalls::new(Arc::clone(&store), GatedCalls::gated()));
    let build = tokio::spawn({
        let calls = Arc::clone(&calls);
        async move {
            calls
                .build_labor(
                    0,
                    BuildLaborProps {
                        realm_id: 6,
                        resource_type: 1,
                        labor_units: 1,
                        multiplier: 2,
                    },
                )
                .await
        }
    });
    // two cost resources and the labor record
    wait_for_overrides(&store, 3).await;

    let cancel = tokio::spawn({
        let calls = Arc::clone(&calls);
        async move {
            calls
                .cancel_fungible_order(ChangeOrderStatusProps {
                    realm_id: 6,
                    trade_id: 2,
                })
                .await
        }
    });
    wait_for_overrides(&store, 4).await;

    let labor = store.get_component::<Labor>(entity).unwrap().unwrap();
    assert_eq!(labor.balance, 10_000 + 7_200);
    assert_eq!(labor.multiplier, 2);

    calls.inner().release(2);
    build.await.unwrap().unwrap();
    cancel.await.unwrap().unwrap();

    assert_eq!(store.override_count().unwrap(), 0);
    assert_eq!(store.get_component::<Labor>(entity).unwrap().unwrap().balance, 10_000);
}

#[tokio::test]
async fn dropped_invocation_removes_its_overrides() {
    let store = new_store();
    let calls = Arc::new(OptimisticSystemCalls::new(Arc::clone(&store), GatedCalls::gated()));

    let pending = tokio::spawn({
        let calls = Arc::clone(&calls);
        async move {
            calls
                .accept_order(AcceptOrderProps {
                    taker_id: 4,
                    trade_id: 9,
                })
                .await
        }
    });
    wait_for_overrides(&store, 2).await;

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());
    assert_eq!(store.override_count().unwrap(), 0);
}
