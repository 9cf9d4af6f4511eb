//! One-shot load of the latest entities.

use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::error::MirrorResult;
use crate::schema::SchemaRegistry;
use crate::storage::ComponentStore;

use super::classify::is_entity_update;
use super::decode::{decode_entities_response, merge_entity};
use super::history::EntityUpdate;
use super::query::latest_entities_query;
use super::transport::GraphQlTransport;

/// Fetches the latest `max` entities (`config.backfill_page_size` when `None`)
/// with every registered component, merges them into the store and returns
/// the relevant ones as updates.
///
/// The update log is not touched; callers decide whether to seed it. A
/// malformed entity is logged and skipped; a failing query fails the load.
pub async fn load_initial_data(
    transport: &dyn GraphQlTransport,
    store: &dyn ComponentStore,
    schema: &SchemaRegistry,
    config: &FeedConfig,
    max: Option<usize>,
) -> MirrorResult<Vec<EntityUpdate>> {
    config.validate()?;
    let first = max.unwrap_or(config.backfill_page_size);
    let request = latest_entities_query(schema, first)?;
    let data = transport.request(request).await?;

    let mut updates = Vec::new();
    let mut merged = 0usize;
    for (i, node) in decode_entities_response(&data)?.into_iter().enumerate() {
        let node = match node {
            Ok(node) => node,
            Err(e) => {
                warn!(edge = i, error = %e, "skipping malformed entity");
                continue;
            }
        };

        // Components outside the schema cannot be merged; keep the rest.
        let names: Vec<&str> = node
            .component_names
            .iter()
            .map(String::as_str)
            .filter(|name| {
                let known = schema.contains(name);
                if !known {
                    debug!(component = *name, "ignoring unregistered component");
                }
                known
            })
            .collect();

        if let Err(e) = merge_entity(store, schema, &node, &names) {
            warn!(edge = i, error = %e, "failed to merge entity");
            continue;
        }
        merged += 1;

        if is_entity_update(&node.component_names) {
            updates.push(EntityUpdate {
                entity_keys: node.keys,
                component_names: node.component_names,
            });
        }
    }

    info!(first, merged, relevant = updates.len(), "initial data loaded");
    Ok(updates)
}
