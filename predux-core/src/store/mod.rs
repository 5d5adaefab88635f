//! State Container
//!
//! A [`Store`] owns one state value. Reads are always allowed; replacing the
//! value is only allowed from inside a bound [`Reducer`], which commits its
//! return value and fires `state_changed` before returning.
//!
//! Reducers are also registered in the store's dispatch table under their
//! method name, so a serialized [`Action`] (`{guid}/{method}` plus JSON
//! arguments) can be routed to them with [`Store::dispatch`].

mod action;
mod binding;
#[allow(clippy::module_inception)]
mod store;
mod window;

pub use action::{Action, ActionType};
pub use binding::{BoundSelector, Reducer};
pub use store::{Store, StoreBuilder};
pub use window::{WindowGuard, WriteWindow};
