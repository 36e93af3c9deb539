//! Tether Core
//!
//! This crate provides a small reactive state runtime. It implements:
//!
//! - Reactive primitives (value cells, signals, memos, effects)
//! - Reducer-driven stores with change notification
//! - Optional persistence of store state to a key-value storage
//! - Injectable deferred scheduling for work that must run "later"
//!
//! Everything runs synchronously on the caller's stack except the two
//! deferred points routed through a [`scheduler::Scheduler`]: the one-time
//! re-assertion of a new [`reactive::ValueCell`] and the per-field write-back
//! of a [`store::PartitionedStore`].
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: value cells, signals, memos, and effects
//! - `store`: subscription bus, stores, and store options
//! - `persist`: the storage trait and its memory and file backends
//! - `scheduler`: the deferred task trait and its implementations
//!
//! # Example
//!
//! ```rust
//! use tether_core::reactive::Signal;
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = count.derive(|c| c * 2);
//!
//! // Create an effect that fires when `doubled` changes
//! count.use_effect(|| println!("doubled changed"), &[doubled.node()]);
//!
//! // Update the signal
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod error;
pub mod persist;
pub mod reactive;
pub mod scheduler;
pub mod store;

pub use error::{StateError, StateResult};
