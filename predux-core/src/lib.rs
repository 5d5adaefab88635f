//! Predux Core
//!
//! This crate provides a small, predictable state container. It implements:
//!
//! - A synchronous signal bus (`reactive`)
//! - Stores with a write-lock window and bound reducers (`store`)
//! - Tagged selectors and compiled state maps (`select`)
//! - A reference consumer that tracks change flags for a binding site
//!   (`connect`)
//!
//! # Architecture
//!
//! - `reactive`: [`Signal`](reactive::Signal) and listener bookkeeping
//! - `store`: [`Store`](store::Store), reducer binding, action routing
//! - `select`: selector taxonomy, memoized composites, evaluation plans
//! - `connect`: [`Connection`](connect::Connection)
//! - `config` / `error`: store configuration and error types
//!
//! # Example
//!
//! ```rust
//! use predux_core::select::{ChangeFlags, Selector, StateMap};
//! use predux_core::store::Store;
//!
//! #[derive(Debug)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! let store = Store::builder(Counter { count: 0 }).guid("counter").build();
//! let increment = store
//!     .reducer("increment", |c: &Counter, (): ()| Counter { count: c.count + 1 })
//!     .unwrap();
//!
//! increment.call(()).unwrap();
//! increment.call(()).unwrap();
//!
//! let plan = StateMap::<Counter, i64, i64>::new()
//!     .with("count", Selector::state(|c: &Counter| c.count))
//!     .with("offset", Selector::props(|c: &Counter, by: &i64| c.count + by))
//!     .compile();
//!
//! let mut values: indexmap::IndexMap<String, i64> = indexmap::IndexMap::new();
//! plan.evaluate(&mut values, &store, &10, ChangeFlags::store());
//! assert_eq!(values["count"], 2);
//! assert_eq!(values["offset"], 12);
//! ```

pub mod config;
pub mod connect;
pub mod error;
pub mod reactive;
pub mod select;
pub mod store;

pub use config::{ListenerErrorPolicy, StoreConfig};
pub use connect::Connection;
pub use error::{EmitError, Result, StoreError};
pub use reactive::{Signal, Subscription};
pub use select::{init_state_map, ChangeFlags, EvaluationPlan, Selector, StateMap};
pub use store::{Action, ActionType, Reducer, Store};
