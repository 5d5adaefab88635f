//! Store Implementation
//!
//! A Store owns exactly one state value. The value can be read by anyone at
//! any time through [`Store::get_state`], but it can only be replaced while
//! the store's write window is open, and only bound reducers open it.
//!
//! # Commit Protocol
//!
//! 1. A bound reducer opens the window.
//!
//! 2. If the store has a guid and somebody listens on `action_dispatched`,
//!    the call is reported there as an [`Action`].
//!
//! 3. The reducer body runs against the current state and returns the next
//!    state. Reads during the body still see the previous state.
//!
//! 4. The returned value replaces the state and `state_changed` fires, all
//!    before the reducer call returns.
//!
//! 5. The window closes, whether the body succeeded, failed or panicked.
//!
//! # Thread Safety
//!
//! The store handle is cheap to clone and `Send + Sync`. The state sits
//! behind a `parking_lot::RwLock` that is only held to swap or clone the
//! `Arc`, never while user code runs.

use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::action::{validate_method_name, Action, ActionType};
use super::binding::{BoundSelector, Reducer};
use super::window::{WindowGuard, WriteWindow};
use crate::config::{ListenerErrorPolicy, StoreConfig};
use crate::error::{EmitError, Result, StoreError};
use crate::reactive::Signal;
use crate::select::ResolvedSelector;

/// Routes a decoded action payload to a bound reducer.
pub(crate) type Route<S> = Arc<dyn Fn(&Store<S>, Action) -> Result<Arc<S>> + Send + Sync>;

struct StoreInner<S: 'static> {
    guid: Option<Arc<str>>,
    config: StoreConfig,
    state: RwLock<Arc<S>>,
    window: WriteWindow,
    state_changed: Signal<()>,
    action_dispatched: Signal<Action>,
    routes: RwLock<IndexMap<Arc<str>, Route<S>>>,
    pending: Mutex<VecDeque<Action>>,
}

/// A state container.
///
/// # Example
///
/// ```rust
/// use predux_core::store::Store;
///
/// let store = Store::builder(0_i64).guid("counter").build();
/// let add = store.reducer("add", |n: &i64, by: i64| n + by).unwrap();
///
/// add.call(5).unwrap();
/// assert_eq!(*store.get_state(), 5);
/// ```
pub struct Store<S: 'static> {
    inner: Arc<StoreInner<S>>,
}

/// Builder for [`Store`].
pub struct StoreBuilder<S> {
    initial: S,
    config: StoreConfig,
}

impl<S: Send + Sync + 'static> StoreBuilder<S> {
    /// Stable identity used as the container part of action types.
    pub fn guid(mut self, guid: impl Into<String>) -> Self {
        self.config.guid = Some(guid.into());
        self
    }

    pub fn listener_errors(mut self, policy: ListenerErrorPolicy) -> Self {
        self.config.listener_errors = policy;
        self
    }

    pub fn queue_nested_dispatch(mut self, queue: bool) -> Self {
        self.config.queue_nested_dispatch = queue;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Store<S> {
        let guid = self.config.guid.as_deref().map(Arc::from);
        tracing::debug!(guid = ?self.config.guid, "store created");

        Store {
            inner: Arc::new(StoreInner {
                guid,
                config: self.config,
                state: RwLock::new(Arc::new(self.initial)),
                window: WriteWindow::new(),
                state_changed: Signal::new(),
                action_dispatched: Signal::new(),
                routes: RwLock::new(IndexMap::new()),
                pending: Mutex::new(VecDeque::new()),
            }),
        }
    }
}

impl<S: Send + Sync + 'static> Store<S> {
    /// Create a store with the default configuration.
    pub fn new(initial: S) -> Self {
        Self::builder(initial).build()
    }

    pub fn builder(initial: S) -> StoreBuilder<S> {
        StoreBuilder {
            initial,
            config: StoreConfig::default(),
        }
    }

    pub fn guid(&self) -> Option<&str> {
        self.inner.guid.as_deref()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The current state.
    ///
    /// Always legal. The returned value is a snapshot; a later commit does
    /// not change it.
    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(&self.inner.state.read())
    }

    /// The current state, for code running inside a bound reducer or
    /// selector.
    ///
    /// Fails with [`StoreError::StateLocked`] when called from outside.
    pub fn state(&self) -> Result<Arc<S>> {
        if !self.inner.window.is_open() {
            return Err(StoreError::StateLocked { operation: "state" });
        }
        Ok(self.get_state())
    }

    /// Replace the state and notify `state_changed`.
    ///
    /// Only legal while the write window is open. When listeners fail under
    /// [`ListenerErrorPolicy::Surface`] the state has still been replaced;
    /// the error only reports the failed notifications.
    pub fn set_state(&self, next: S) -> Result<Arc<S>> {
        if !self.inner.window.is_open() {
            tracing::error!(guid = ?self.inner.guid, "state replaced outside of a reducer");
            return Err(StoreError::StateLocked {
                operation: "set_state",
            });
        }

        let next = Arc::new(next);
        *self.inner.state.write() = Arc::clone(&next);
        tracing::debug!(guid = ?self.inner.guid, "state committed");

        self.apply_policy(self.inner.state_changed.emit(&()))?;
        Ok(next)
    }

    /// Fires after every committed state replacement.
    pub fn state_changed(&self) -> &Signal<()> {
        &self.inner.state_changed
    }

    /// Fires before a reducer body runs, with the action describing the
    /// call. Only used by stores with a guid.
    pub fn action_dispatched(&self) -> &Signal<Action> {
        &self.inner.action_dispatched
    }

    /// True unless the calling thread is inside a bound method.
    pub fn is_locked(&self) -> bool {
        !self.inner.window.is_open()
    }

    /// True if both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn open_window(&self) -> WindowGuard<'_> {
        self.inner.window.open()
    }

    /// Bind a reducer and register it in the dispatch table.
    ///
    /// The name becomes the method part of the action type and must be
    /// unique within the store.
    pub fn reducer<A, F>(&self, name: &str, body: F) -> Result<Reducer<S, A>>
    where
        A: Serialize + DeserializeOwned + 'static,
        F: Fn(&S, A) -> S + Send + Sync + 'static,
    {
        validate_method_name(name)?;
        let method: Arc<str> = Arc::from(name);
        let kind = ActionType::from_parts(self.inner.guid.clone(), Arc::clone(&method));
        let reducer = Reducer::new(self.clone(), kind, Arc::new(body));

        let mut routes = self.inner.routes.write();
        if routes.contains_key(name) {
            tracing::warn!(guid = ?self.inner.guid, method = name, "duplicate reducer");
            return Err(StoreError::DuplicateReducer(name.to_string()));
        }
        routes.insert(method, reducer.route());
        tracing::debug!(guid = ?self.inner.guid, method = name, "reducer registered");

        Ok(reducer)
    }

    /// Bind a selector method.
    pub fn selector<A, R, F>(&self, name: &str, body: F) -> Result<BoundSelector<S, A, R>>
    where
        F: Fn(&S, A) -> R + Send + Sync + 'static,
    {
        validate_method_name(name)?;
        Ok(BoundSelector::new(self.clone(), Arc::from(name), Arc::new(body)))
    }

    /// Names of the registered reducers, in registration order.
    pub fn reducer_names(&self) -> Vec<String> {
        self.inner.routes.read().keys().map(|k| k.to_string()).collect()
    }

    /// The action type a reducer registered as `method` would use.
    pub fn action_type(&self, method: &str) -> Result<ActionType> {
        ActionType::new(self.guid(), method)
    }

    /// Build an action for `method` from typed arguments.
    pub fn action<A: Serialize + ?Sized>(&self, method: &str, args: &A) -> Result<Action> {
        Action::encode(self.action_type(method)?, args)
    }

    /// Evaluate a selector against the current state inside the window.
    pub fn select<P, V>(&self, selector: &ResolvedSelector<S, P, V>, props: &P) -> V {
        let _window = self.open_window();
        let state = self.get_state();
        selector.evaluate(&state, props)
    }

    /// Dispatch a plain action to its reducer.
    ///
    /// Equivalent to `dispatch_with(action, false)`.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.dispatch_with(action, false)
    }

    /// Dispatch a plain action.
    ///
    /// When called from inside a reducer of this store and
    /// `queue_nested_dispatch` is on, the action is queued and runs after
    /// the outermost reducer has committed, unless `force_immediate` is set.
    pub fn dispatch_with(&self, action: Action, force_immediate: bool) -> Result<()> {
        if self.inner.config.queue_nested_dispatch
            && !force_immediate
            && self.inner.window.is_open()
        {
            tracing::debug!(action = %action.kind(), "dispatch queued until commit");
            self.inner.pending.lock().push_back(action);
            return Ok(());
        }

        let result = self.route(action).map(|_| ());
        if self.inner.window.is_open() {
            result
        } else {
            merge(result, self.drain_pending())
        }
    }

    /// Run a thunk with this store and return whatever it returns.
    ///
    /// The thunk can dispatch synchronously or hand back a future that
    /// dispatches later; no window is held while that future runs.
    pub fn dispatch_thunk<R, F>(&self, thunk: F) -> R
    where
        F: FnOnce(Store<S>) -> R,
    {
        thunk(self.clone())
    }

    /// Run an async thunk as a task on the current tokio runtime.
    pub fn spawn_thunk<F, Fut>(&self, thunk: F) -> Result<JoinHandle<Fut::Output>>
    where
        F: FnOnce(Store<S>) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let handle = Handle::try_current()?;
        Ok(handle.spawn(thunk(self.clone())))
    }

    /// Number of actions waiting for the current window to close.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    fn route(&self, action: Action) -> Result<Arc<S>> {
        if let Some(container) = action.kind().container() {
            if self.guid() != Some(container) {
                return Err(StoreError::ForeignAction {
                    action: action.kind().to_string(),
                    container: self.guid().unwrap_or_default().to_string(),
                });
            }
        }

        let route = self.inner.routes.read().get(action.kind().method()).cloned();
        match route {
            Some(route) => {
                tracing::debug!(action = %action.kind(), "dispatch");
                route(self, action)
            }
            None => {
                tracing::warn!(action = %action.kind(), "no reducer for action");
                Err(StoreError::UnknownAction(action.kind().to_string()))
            }
        }
    }

    /// Replay queued actions. Runs every one of them and returns the first
    /// error, if any.
    pub(crate) fn drain_pending(&self) -> Result<()> {
        let mut first_error = None;

        loop {
            let next = self.inner.pending.lock().pop_front();
            let Some(action) = next else { break };

            if let Err(err) = self.route(action) {
                tracing::warn!(error = %err, "queued action failed");
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Apply the configured listener policy to an emission result.
    pub(crate) fn apply_policy(&self, emitted: std::result::Result<(), EmitError>) -> Result<()> {
        match (emitted, self.inner.config.listener_errors) {
            (Ok(()), _) => Ok(()),
            (Err(err), ListenerErrorPolicy::Surface) => Err(err.into()),
            (Err(err), ListenerErrorPolicy::Log) => {
                tracing::warn!(guid = ?self.inner.guid, error = %err, "listener failures ignored");
                Ok(())
            }
        }
    }

    /// Report a call on the trace channel if anyone is listening.
    ///
    /// `build` only runs when the record is actually needed.
    pub(crate) fn trace<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<Action>,
    {
        if self.inner.guid.is_none() || self.inner.action_dispatched.is_empty() {
            return Ok(());
        }

        let action = build()?;
        tracing::trace!(action = %action, "action traced");
        self.apply_policy(self.inner.action_dispatched.emit(&action))
    }
}

/// Keep the first error of two results.
pub(crate) fn merge(first: Result<()>, second: Result<()>) -> Result<()> {
    match (first, second) {
        (Err(err), _) | (Ok(()), Err(err)) => Err(err),
        (Ok(()), Ok(())) => Ok(()),
    }
}

impl<S: 'static> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Debug + 'static> Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("guid", &self.inner.guid)
            .field("state", &*self.inner.state.read())
            .field("reducers", &self.inner.routes.read().len())
            .finish()
    }
}

/// Decode an action payload into a reducer's argument type.
pub(crate) fn decode_args<A: DeserializeOwned>(action: &ActionType, payload: Value) -> Result<A> {
    serde_json::from_value(payload).map_err(|source| StoreError::Payload {
        action: action.to_string(),
        source,
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::Selector;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Counter {
        count: i32,
    }

    fn counter() -> Store<Counter> {
        Store::builder(Counter { count: 0 }).guid("counter").build()
    }

    #[test]
    fn store_starts_locked() {
        let store = counter();
        assert!(store.is_locked());
        assert_eq!(store.get_state().count, 0);
    }

    #[test]
    fn set_state_outside_reducer_is_rejected() {
        let store = counter();
        let err = store.set_state(Counter { count: 9 }).unwrap_err();

        assert!(matches!(err, StoreError::StateLocked { operation: "set_state" }));
        assert_eq!(store.get_state().count, 0);
    }

    #[test]
    fn in_window_read_outside_reducer_is_rejected() {
        let store = counter();
        assert!(matches!(store.state(), Err(StoreError::StateLocked { .. })));
    }

    #[test]
    fn increment_three_times() {
        let store = counter();
        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        store.state_changed().on(move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let increment = store
            .reducer("increment", |s: &Counter, (): ()| Counter { count: s.count + 1 })
            .unwrap();

        for _ in 0..3 {
            increment.call(()).unwrap();
        }

        assert_eq!(store.get_state().count, 3);
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(store.is_locked());
    }

    #[test]
    fn duplicate_reducer_is_a_configuration_error() {
        let store = counter();
        store.reducer("reset", |_: &Counter, (): ()| Counter { count: 0 }).unwrap();

        let err = store
            .reducer("reset", |_: &Counter, (): ()| Counter { count: 0 })
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, StoreError::DuplicateReducer(name) if name == "reset"));
    }

    #[test]
    fn invalid_reducer_name_is_rejected_at_bind_time() {
        let store = counter();
        let err = store
            .reducer("a/b", |s: &Counter, (): ()| s.clone())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidMethodName { .. }));
        assert!(store.reducer_names().is_empty());
    }

    #[test]
    fn dispatch_routes_by_type_tag() {
        let store = counter();
        store
            .reducer("add", |s: &Counter, by: i32| Counter { count: s.count + by })
            .unwrap();

        store.dispatch(store.action("add", &4).unwrap()).unwrap();
        store
            .dispatch(Action::encode(ActionType::parse("counter/add").unwrap(), &6).unwrap())
            .unwrap();

        assert_eq!(store.get_state().count, 10);
    }

    #[test]
    fn dispatch_rejects_unknown_and_foreign_actions() {
        let store = counter();

        let unknown = store.dispatch(store.action("missing", &()).unwrap());
        assert!(matches!(unknown, Err(StoreError::UnknownAction(tag)) if tag == "counter/missing"));

        let foreign = Action::encode(ActionType::parse("todos/add").unwrap(), &1).unwrap();
        assert!(matches!(store.dispatch(foreign), Err(StoreError::ForeignAction { .. })));
    }

    #[test]
    fn dispatch_rejects_bad_payload() {
        let store = counter();
        store
            .reducer("add", |s: &Counter, by: i32| Counter { count: s.count + by })
            .unwrap();

        let action = store.action("add", &"three").unwrap();
        assert!(matches!(store.dispatch(action), Err(StoreError::Payload { .. })));
        assert_eq!(store.get_state().count, 0);
    }

    #[test]
    fn select_evaluates_inside_window() {
        let store = counter();
        let probe = store.clone();
        let doubled = Selector::<Counter, (), i32>::state(move |s: &Counter| {
            assert!(!probe.is_locked());
            s.count * 2
        })
        .resolve();

        assert_eq!(store.select(&doubled, &()), 0);
        assert!(store.is_locked());
    }

    #[test]
    fn listener_failures_surface_after_commit() {
        let store = counter();
        store.state_changed().on(|_| panic!("subscriber broke"));
        let increment = store
            .reducer("increment", |s: &Counter, (): ()| Counter { count: s.count + 1 })
            .unwrap();

        let err = increment.call(()).unwrap_err();
        assert!(matches!(err, StoreError::Listeners(_)));
        assert_eq!(store.get_state().count, 1);
    }

    #[test]
    fn listener_failures_can_be_logged_only() {
        let store = Store::builder(Counter { count: 0 })
            .listener_errors(ListenerErrorPolicy::Log)
            .build();
        store.state_changed().on(|_| panic!("subscriber broke"));
        let increment = store
            .reducer("increment", |s: &Counter, (): ()| Counter { count: s.count + 1 })
            .unwrap();

        assert_eq!(increment.call(()).unwrap().count, 1);
    }

    #[test]
    fn spawn_thunk_outside_runtime_fails() {
        let store = counter();
        let result = store.spawn_thunk(|_store| async {});
        assert!(result.is_err());
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = counter();
        let b = counter();
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }
}
