//! Persistent Key-Value Storage
//!
//! Stores that persist their state talk to a [`Storage`] handed to them at
//! construction. Storage is addressed by plain string keys:
//!
//! - a [`Store`](crate::store::Store) uses its configured key (`"state"` by default)
//! - a [`PartitionedStore`](crate::store::PartitionedStore) uses one
//!   `key:field` slot per top-level field
//!
//! The key doubles as a namespace. Two stores given the same storage and the
//! same key will overwrite each other; nothing here locks or isolates them.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StateResult;

/// Synchronous string key-value capability.
pub trait Storage: Send + Sync {
    /// Read the text stored under `key`, or `None` if the slot is empty.
    fn get(&self, key: &str) -> Option<String>;

    /// Replace the text stored under `key`.
    fn set(&self, key: &str, value: String) -> StateResult<()>;
}

/// Slot name for one field of a partitioned store.
pub fn field_slot(key: &str, field: &str) -> String {
    format!("{key}:{field}")
}
