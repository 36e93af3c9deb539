//! Reducer-Driven Stores
//!
//! This module implements the dispatch/subscribe containers and the bus
//! they notify through.
//!
//! - [`SubscriptionBus`]: payload-free fan-out notifier
//! - [`Store`]: reducer-driven container, optionally persisted as one JSON
//!   document
//! - [`PartitionedStore`]: container of scalar fields, optionally persisted
//!   one plain-text slot per field with deferred write-back
//!
//! Both stores are configured with [`StoreOptions`].

mod bus;
mod container;
mod options;
mod partitioned;
mod scalar;

pub use bus::{Subscription, SubscriptionBus};
pub use container::Store;
pub use options::{Coercion, StoreOptions, DEFAULT_KEY};
pub use partitioned::PartitionedStore;
pub use scalar::{PartitionState, Scalar};
