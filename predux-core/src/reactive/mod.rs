//! Signal Bus
//!
//! This module implements the synchronous notification primitive used by
//! the store: a [`Signal`] holds an ordered list of listeners and calls
//! them, one after the other, every time it is emitted.
//!
//! # Concepts
//!
//! ## Listeners
//!
//! A listener is a closure receiving the emitted arguments by reference.
//! Every registration gets its own [`ListenerId`]; the same closure attached
//! twice runs twice.
//!
//! ## Subscriptions
//!
//! [`Signal::subscribe`] returns a [`Subscription`] guard that detaches the
//! listener when dropped. Plain [`Signal::on`] leaves detachment to the
//! caller.
//!
//! # Implementation Notes
//!
//! Emission walks a snapshot of the listener list and re-checks membership
//! before each call, so listeners can attach and detach listeners (including
//! themselves) while being notified.

mod signal;
mod subscriber;

pub use signal::{Signal, Subscription};
pub use subscriber::{Listener, ListenerId};
