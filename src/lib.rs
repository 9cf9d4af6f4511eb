//! # realmsync - optimistic client mirror of on-chain game state
//!
//! realmsync keeps a local entity-component store in step with an indexer and
//! lets a UI show the effect of a user action before the chain confirms it.
//!
//! ## Core Concepts
//!
//! - **Entity**: an id derived from a sequence of felt keys
//! - **Component**: a named field record attached to an entity
//! - **Override**: a tagged, temporary record layered over the authoritative one
//! - **Optimistic call**: predict, overlay, run the real action, remove the overlay
//! - **Feed**: push notifications resolved into the store and a capped update log
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use realmsync::{ComponentStore, InMemoryComponentStore, OptimisticSystemCalls};
//! use realmsync::optimistic::HarvestLaborProps;
//!
//! let store: Arc<dyn ComponentStore> = Arc::new(InMemoryComponentStore::new());
//! let calls = OptimisticSystemCalls::new(Arc::clone(&store), chain_calls);
//!
//! // The harvested resources show up in `store` until the transaction settles.
//! calls
//!     .harvest_labor(now, HarvestLaborProps { realm_id: 1, resource_type: 254 })
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod schema;
pub mod time;
pub mod value;

// Store, overlay engine, actions and feed
pub mod feed;
pub mod optimistic;
pub mod overlay;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use component::Component;
pub use config::{FeedConfig, LaborConfig, OptimisticConfig};
pub use entity::{EntityId, EntityKey, Felt};
pub use error::{
    ActionError, DecodeError, MirrorError, MirrorResult, SchemaError, TransportError, ValidationError,
};
pub use schema::SchemaRegistry;
pub use time::{Clock, FixedClock, SystemClock};
pub use value::Record;

pub use feed::{load_initial_data, EntitySubscription, EntityUpdate, GraphQlTransport, UpdateLog};
pub use optimistic::{OptimisticSystemCalls, SystemCalls};
pub use overlay::{run_optimistic, OverlayScope, OverlayState, OverrideTag};
pub use storage::{ComponentStore, ComponentStoreExt, InMemoryComponentStore, StorageError};
