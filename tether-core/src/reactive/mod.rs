//! Reactive Primitives
//!
//! This module implements the value-level primitives: cells, signals, memos,
//! and effects.
//!
//! # Concepts
//!
//! ## Value Cells
//!
//! A [`ValueCell`] holds a value and runs a `before_update` and an
//! `after_update` hook around every write, whether or not the value changed.
//!
//! ## Signals
//!
//! A [`Signal`] holds a value and ignores writes that do not change it. A
//! changing write checks the signal's effects and runs the triggered ones
//! before `set` returns.
//!
//! ## Memos
//!
//! A [`Memo`] is a value derived from a signal. It recomputes only when the
//! signal's value differs from the one it last computed from, and only when
//! pulled: by a read, or by an effect deciding whether to fire.
//!
//! ## Effects
//!
//! An effect is a callback registered on a signal with an explicit list of
//! memo dependencies. Dependencies are declared, not discovered: there is no
//! ambient tracking context.

mod cell;
mod effect;
mod memo;
mod signal;
mod subscriber;

pub use cell::{CellHooks, Hook, ValueCell};
pub use effect::EffectHandle;
pub use memo::{Memo, MemoNode, MemoState, Tracked};
pub use signal::Signal;
pub use subscriber::{Listener, Subscriber, SubscriberId};
