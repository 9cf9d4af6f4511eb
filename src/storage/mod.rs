//! Component store contract and the in-memory backend.

mod memory;
mod traits;

pub use memory::InMemoryComponentStore;
pub use traits::{ComponentStore, ComponentStoreExt, Override, StorageError};
