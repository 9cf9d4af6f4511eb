//! Entity change feed.
//!
//! The indexer pushes "entity changed" notifications naming the changed
//! components. Each one is resolved with a point query, merged into the store
//! and, when relevant to the UI, prepended to an [`UpdateLog`]. A bulk
//! backfill loads the latest entities at startup.

mod backfill;
mod classify;
mod decode;
mod history;
mod query;
mod subscription;
mod transport;

pub use backfill::load_initial_data;
pub use classify::{classify, is_entity_update, UpdateKind};
pub use decode::{
    decode_entities_response, decode_entity_response, decode_notification, merge_entity, split_component_names,
    ComponentData, EntityNode, EntityUpdated, IdList,
};
pub use history::{EntityUpdate, UpdateLog};
pub use query::{
    component_fragments, entity_query, entity_updated_subscription, latest_entities_query, ENTITY_UPDATED_SUBSCRIPTION,
};
pub use subscription::{EntitySubscription, FeedStats};
pub use transport::{GraphQlRequest, GraphQlTransport, NotificationStream};
