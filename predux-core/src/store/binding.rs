//! Bound reducers and selectors.
//!
//! Binding wraps a plain function at construction time so that it runs with
//! the store's write window open. A bound reducer commits whatever its body
//! returns; a bound selector only reads.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::action::{Action, ActionType};
use super::store::{decode_args, merge, Route, Store};
use crate::error::Result;

type ReducerFn<S, A> = Arc<dyn Fn(&S, A) -> S + Send + Sync>;
type SelectorFn<S, A, R> = Arc<dyn Fn(&S, A) -> R + Send + Sync>;

/// A reducer bound to a store. Created by [`Store::reducer`].
pub struct Reducer<S: 'static, A> {
    store: Store<S>,
    kind: ActionType,
    body: ReducerFn<S, A>,
}

impl<S, A> Reducer<S, A>
where
    S: Send + Sync + 'static,
    A: Serialize + DeserializeOwned + 'static,
{
    pub(crate) fn new(store: Store<S>, kind: ActionType, body: ReducerFn<S, A>) -> Self {
        Self { store, kind, body }
    }

    /// The action type this reducer answers to.
    pub fn action_type(&self) -> &ActionType {
        &self.kind
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    /// Run the reducer and commit its result.
    ///
    /// Returns the state this call committed.
    pub fn call(&self, args: A) -> Result<Arc<S>> {
        let kind = &self.kind;
        invoke(&self.store, &self.body, args, |args| {
            Action::encode(kind.clone(), args)
        })
    }

    /// Build the dispatch-table entry for this reducer.
    pub(crate) fn route(&self) -> Route<S> {
        let body = Arc::clone(&self.body);
        Arc::new(move |store: &Store<S>, action: Action| {
            let args: A = decode_args(action.kind(), action.payload().clone())?;
            invoke(store, &body, args, move |_| Ok(action))
        })
    }
}

/// Run a reducer body inside the window and commit its result.
///
/// `trace` builds the action record and only runs if somebody listens for
/// it. Actions queued by nested dispatches are replayed once the outermost
/// window has closed.
fn invoke<S, A, T>(store: &Store<S>, body: &ReducerFn<S, A>, args: A, trace: T) -> Result<Arc<S>>
where
    S: Send + Sync + 'static,
    T: FnOnce(&A) -> Result<Action>,
{
    let (traced, committed) = {
        let _window = store.open_window();
        // A failed trace is reported after the commit, never instead of it.
        let traced = store.trace(|| trace(&args));

        let current = store.get_state();
        let next = body(&current, args);
        (traced, store.set_state(next))
    };

    let drained = if store.is_locked() {
        store.drain_pending()
    } else {
        Ok(())
    };

    let state = committed?;
    merge(traced, drained)?;
    Ok(state)
}

impl<S: 'static, A> Clone for Reducer<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            kind: self.kind.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl<S: 'static, A> fmt::Debug for Reducer<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer")
            .field("action", &self.kind.to_string())
            .finish()
    }
}

/// A read-only method bound to a store. Created by [`Store::selector`].
pub struct BoundSelector<S: 'static, A, R> {
    store: Store<S>,
    name: Arc<str>,
    body: SelectorFn<S, A, R>,
}

impl<S: Send + Sync + 'static, A, R> BoundSelector<S, A, R> {
    pub(crate) fn new(store: Store<S>, name: Arc<str>, body: SelectorFn<S, A, R>) -> Self {
        Self { store, name, body }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the selector with the window open.
    pub fn call(&self, args: A) -> R {
        let _window = self.store.open_window();
        let state = self.store.get_state();
        (self.body)(&state, args)
    }
}

impl<S: 'static, A, R> Clone for BoundSelector<S, A, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: Arc::clone(&self.name),
            body: Arc::clone(&self.body),
        }
    }
}

impl<S: 'static, A, R> fmt::Debug for BoundSelector<S, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSelector")
            .field("name", &self.name)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
