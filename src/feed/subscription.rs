//! Live entity feed: push notifications resolved into the store.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::entity::EntityId;
use crate::error::{MirrorError, MirrorResult};
use crate::schema::SchemaRegistry;
use crate::storage::ComponentStore;

use super::classify::is_entity_update;
use super::decode::{decode_entity_response, decode_notification, merge_entity};
use super::history::{EntityUpdate, UpdateLog};
use super::query::{entity_query, entity_updated_subscription};
use super::transport::{GraphQlTransport, NotificationStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopSignal {
    Running,
    /// Stop intake, let in-flight resolutions finish.
    Drain,
    /// Stop intake, cancel in-flight resolutions.
    Abort,
}

#[derive(Debug, Default)]
struct FeedCounters {
    resolved: AtomicU64,
    failed: AtomicU64,
    filtered: AtomicU64,
}

impl FeedCounters {
    fn snapshot(&self) -> FeedStats {
        FeedStats {
            resolved: self.resolved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
        }
    }
}

/// Feed counters at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedStats {
    /// Notifications merged into the store.
    pub resolved: u64,
    /// Notifications dropped on a decode, query or store error.
    pub failed: u64,
    /// Resolved notifications the classifier kept out of the log.
    pub filtered: u64,
}

struct FeedContext {
    transport: Arc<dyn GraphQlTransport>,
    store: Arc<dyn ComponentStore>,
    schema: Arc<SchemaRegistry>,
    log: Arc<UpdateLog>,
    history_capacity: usize,
    counters: FeedCounters,
}

enum Resolution {
    Published(EntityUpdate),
    Filtered(EntityId),
}

/// Handle to a running entity feed.
///
/// Each notification is resolved on its own task: the changed components are
/// queried, merged into the store, and relevant updates are prepended to the
/// log in completion order. A failing notification is logged and skipped.
///
/// Dropping the handle aborts the feed.
pub struct EntitySubscription {
    ctx: Arc<FeedContext>,
    stop: watch::Sender<StopSignal>,
    driver: Option<JoinHandle<()>>,
}

impl EntitySubscription {
    /// Subscribes to `entityUpdated` and starts resolving notifications.
    ///
    /// Must be called inside a tokio runtime. Fails if the configuration is
    /// invalid or the subscription cannot be opened. Published updates keep at
    /// most `config.history_capacity` entries in `log`, or fewer if the log
    /// itself is smaller.
    pub async fn start(
        transport: Arc<dyn GraphQlTransport>,
        store: Arc<dyn ComponentStore>,
        schema: Arc<SchemaRegistry>,
        log: Arc<UpdateLog>,
        config: FeedConfig,
    ) -> MirrorResult<Self> {
        config.validate()?;

        let stream = transport.subscribe(entity_updated_subscription()).await?;
        info!(
            max_in_flight = config.max_in_flight,
            history_capacity = config.history_capacity,
            "entity subscription started"
        );

        let ctx = Arc::new(FeedContext {
            transport,
            store,
            schema,
            log,
            history_capacity: config.history_capacity,
            counters: FeedCounters::default(),
        });
        let (stop, stop_rx) = watch::channel(StopSignal::Running);
        let permits = Arc::new(Semaphore::new(config.max_in_flight));
        let driver = tokio::spawn(drive(Arc::clone(&ctx), stream, stop_rx, permits));

        Ok(Self {
            ctx,
            stop,
            driver: Some(driver),
        })
    }

    /// The log this feed publishes to.
    #[must_use]
    pub fn log(&self) -> &Arc<UpdateLog> {
        &self.ctx.log
    }

    #[must_use]
    pub fn stats(&self) -> FeedStats {
        self.ctx.counters.snapshot()
    }

    /// True once the feed stopped, after completion or shutdown.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.driver.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits until the server completes the subscription and every pending
    /// resolution settled.
    pub async fn join(mut self) -> FeedStats {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!(error = %e, "entity feed driver failed");
            }
        }
        self.stats()
    }

    /// Stops intake and waits for in-flight resolutions to finish.
    pub async fn drain(mut self) -> FeedStats {
        self.finish(StopSignal::Drain).await;
        self.stats()
    }

    /// Stops intake and cancels in-flight resolutions.
    pub async fn shutdown(mut self) -> FeedStats {
        self.finish(StopSignal::Abort).await;
        self.stats()
    }

    async fn finish(&mut self, signal: StopSignal) {
        // The driver may already be gone after completion.
        let _ = self.stop.send(signal);

        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                if e.is_panic() {
                    warn!(error = %e, "entity feed driver panicked");
                }
            }
        }
    }
}

impl fmt::Debug for EntitySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySubscription")
            .field("stats", &self.stats())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

impl Drop for EntitySubscription {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

async fn drive(
    ctx: Arc<FeedContext>,
    mut stream: NotificationStream,
    mut stop: watch::Receiver<StopSignal>,
    permits: Arc<Semaphore>,
) {
    let mut tasks = JoinSet::new();

    let signal = loop {
        tokio::select! {
            changed = stop.changed() => {
                break match changed {
                    Ok(()) => *stop.borrow_and_update(),
                    Err(_) => StopSignal::Abort,
                };
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => reap(&ctx, joined),
            item = stream.next() => match item {
                Some(Ok(data)) => {
                    let ctx = Arc::clone(&ctx);
                    let permits = Arc::clone(&permits);
                    tasks.spawn(async move {
                        // Held for the whole resolution.
                        let Ok(_permit) = permits.acquire_owned().await else {
                            return;
                        };
                        process(&ctx, data).await;
                    });
                }
                Some(Err(e)) => warn!(error = %e, "entity subscription error"),
                None => {
                    info!("entity subscription completed");
                    break StopSignal::Drain;
                }
            },
        }
    };

    if signal == StopSignal::Abort {
        debug!(in_flight = tasks.len(), "aborting entity feed");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    } else {
        debug!(in_flight = tasks.len(), "draining entity feed");
        while let Some(joined) = tasks.join_next().await {
            reap(&ctx, joined);
        }
    }
}

fn reap(ctx: &FeedContext, joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            ctx.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "entity resolution panicked");
        }
    }
}

async fn process(ctx: &FeedContext, data: Value) {
    match resolve(ctx, &data).await {
        Ok(Resolution::Published(update)) => {
            ctx.counters.resolved.fetch_add(1, Ordering::Relaxed);
            debug!(components = ?update.component_names, "entity update published");
            ctx.log.prepend_capped(update, ctx.history_capacity);
        }
        Ok(Resolution::Filtered(entity)) => {
            ctx.counters.resolved.fetch_add(1, Ordering::Relaxed);
            ctx.counters.filtered.fetch_add(1, Ordering::Relaxed);
            debug!(entity = %entity, "entity update merged, not published");
        }
        Err(e) => {
            ctx.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "failed to resolve entity update");
        }
    }
}

async fn resolve(ctx: &FeedContext, data: &Value) -> Result<Resolution, MirrorError> {
    let notification = decode_notification(data)?;
    let names = notification.component_names();

    let request = entity_query(&ctx.schema, &notification.id.to_vec(), &names)?;
    let response = ctx.transport.request(request).await?;
    let node = decode_entity_response(&response)?;
    let entity = merge_entity(ctx.store.as_ref(), &ctx.schema, &node, &names)?;

    if is_entity_update(&names) {
        Ok(Resolution::Published(EntityUpdate {
            entity_keys: node.keys,
            component_names: names,
        }))
    } else {
        Ok(Resolution::Filtered(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    use crate::error::TransportError;
    use crate::feed::transport::GraphQlRequest;
    use crate::storage::InMemoryComponentStore;

    type Sender = mpsc::UnboundedSender<Result<Value, TransportError>>;

    /// Transport answering point queries from a table keyed by entity id.
    struct TableTransport {
        entities: Mutex<HashMap<String, Value>>,
        stream: Mutex<Option<NotificationStream>>,
    }

    impl TableTransport {
        fn new() -> (Arc<Self>, Sender) {
            let (tx, rx) = mpsc::unbounded_channel();
            let transport = Arc::new(Self {
                entities: Mutex::new(HashMap::new()),
                stream: Mutex::new(Some(Box::pin(UnboundedReceiverStream::new(rx)))),
            });
            (transport, tx)
        }

        fn insert(&self, id: &str, entity: Value) {
            self.entities.lock().unwrap().insert(id.to_string(), entity);
        }
    }

    #[async_trait]
    impl GraphQlTransport for TableTransport {
        async fn request(&self, request: GraphQlRequest) -> Result<Value, TransportError> {
            let id = request.variables.as_ref().and_then(|v| v["id"][0].as_str()).unwrap_or_default().to_string();
            match self.entities.lock().unwrap().get(&id) {
                Some(entity) => Ok(json!({ "entity": entity })),
                None => Err(TransportError::RequestFailed {
                    message: format!("no entity {id}"),
                }),
            }
        }

        async fn subscribe(&self, _request: GraphQlRequest) -> Result<NotificationStream, TransportError> {
            self.stream
                .lock()
                .unwrap()
                .take()
                .ok_or(TransportError::SubscriptionClosed)
        }
    }

    fn notification(id: &str, names: &str) -> Result<Value, TransportError> {
        Ok(json!({ "entityUpdated": { "id": [id], "keys": [id], "componentNames": names } }))
    }

    async fn start(transport: Arc<TableTransport>) -> (EntitySubscription, Arc<dyn ComponentStore>) {
        let store: Arc<dyn ComponentStore> = Arc::new(InMemoryComponentStore::new());
        let feed = EntitySubscription::start(
            transport,
            Arc::clone(&store),
            Arc::new(SchemaRegistry::eternum()),
            Arc::new(UpdateLog::new()),
            FeedConfig::default(),
        )
        .await
        .unwrap();
        (feed, store)
    }

    #[tokio::test]
    async fn test_feed_merges_and_publishes_relevant_updates() {
        let (transport, tx) = TableTransport::new();
        transport.insert(
            "0x5",
            json!({ "keys": ["0x5"], "components": [
                { "__typename": "Trade", "maker_id": 1, "taker_id": 0 },
                { "__typename": "Status", "value": 1 },
            ] }),
        );
        transport.insert(
            "0x6",
            json!({ "keys": ["0x6"], "components": [{ "__typename": "Labor", "balance": 10 }] }),
        );
        let (feed, store) = start(transport).await;
        let log = Arc::clone(feed.log());

        tx.send(notification("0x5", "Trade,Status")).unwrap();
        tx.send(notification("0x6", "Labor")).unwrap();
        drop(tx);
        let stats = feed.join().await;

        assert_eq!(stats, FeedStats { resolved: 2, failed: 0, filtered: 1 });
        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].component_names, vec!["Trade", "Status"]);
        assert_eq!(store.get("Status", EntityId::from_ids(&[5])).unwrap().unwrap()["value"], json!(1));
        assert!(store.get("Labor", EntityId::from_ids(&[6])).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_feed_survives_failures() {
        let (transport, tx) = TableTransport::new();
        transport.insert(
            "0x7",
            json!({ "keys": ["0x7", "0x2"], "components": [{ "__typename": "Resource", "balance": 3 }] }),
        );
        let (feed, _store) = start(transport).await;
        let log = Arc::clone(feed.log());

        tx.send(notification("0x404", "Resource")).unwrap();
        tx.send(Ok(json!({ "unexpected": true }))).unwrap();
        tx.send(Err(TransportError::ConnectionFailed {
            message: "socket reset".to_string(),
        }))
        .unwrap();
        tx.send(notification("0x7", "Resource")).unwrap();
        drop(tx);
        let stats = feed.join().await;

        assert_eq!(stats.failed, 2);
        assert_eq!(stats.resolved, 1);
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_history_capacity_bounds_published_log() {
        let (transport, tx) = TableTransport::new();
        for n in 1..=3u64 {
            transport.insert(
                &format!("{n:#x}"),
                json!({ "keys": [format!("{n:#x}"), "0x2"], "components": [{ "__typename": "Resource", "balance": n }] }),
            );
        }
        let log = Arc::new(UpdateLog::new());
        let feed = EntitySubscription::start(
            transport,
            Arc::new(InMemoryComponentStore::new()),
            Arc::new(SchemaRegistry::eternum()),
            Arc::clone(&log),
            FeedConfig {
                history_capacity: 2,
                ..FeedConfig::default()
            },
        )
        .await
        .unwrap();

        for n in 1..=3u64 {
            tx.send(notification(&format!("{n:#x}"), "Resource")).unwrap();
        }
        drop(tx);
        let stats = feed.join().await;

        assert_eq!(stats.resolved, 3);
        assert_eq!(log.len(), 2);
        assert_eq!(log.capacity(), 16);
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_work() {
        let (transport, tx) = TableTransport::new();
        transport.insert(
            "0x9",
            json!({ "keys": ["0x9"], "components": [{ "__typename": "Resource", "balance": 1 }] }),
        );
        let (feed, _store) = start(transport).await;
        let log = Arc::clone(feed.log());

        tx.send(notification("0x9", "Resource")).unwrap();
        // Let the driver pick the notification up before intake stops.
        while log.is_empty() {
            tokio::task::yield_now().await;
        }
        let stats = feed.drain().await;
        assert_eq!(stats.resolved, 1);
        assert!(tx.send(notification("0x9", "Resource")).is_err());
    }

    #[tokio::test]
    async fn test_shutdown_stops_intake() {
        let (transport, tx) = TableTransport::new();
        let (feed, _store) = start(transport).await;
        let log = Arc::clone(feed.log());

        let stats = feed.shutdown().await;
        assert_eq!(stats, FeedStats::default());
        // Nobody is listening any more.
        assert!(tx.send(notification("0x1", "Resource")).is_err());
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_start_fails_when_subscription_unavailable() {
        let (transport, _tx) = TableTransport::new();
        transport.stream.lock().unwrap().take();

        let store: Arc<dyn ComponentStore> = Arc::new(InMemoryComponentStore::new());
        let err = EntitySubscription::start(
            transport,
            store,
            Arc::new(SchemaRegistry::eternum()),
            Arc::new(UpdateLog::new()),
            FeedConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(err.is_transport());
    }
}
