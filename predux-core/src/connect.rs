//! Connection
//!
//! A Connection is the consumer side of an evaluation plan: it keeps the
//! derived values for one binding site and works out the three change flags
//! the plan needs.
//!
//! - `store_changed`: the store handle passed in is not the one used last
//!   time (identity, not state, comparison).
//! - `state_changed`: the current store fired `state_changed` since the
//!   last refresh.
//! - `props_changed`: the props differ from the previous ones (`PartialEq`).
//!
//! UI layers typically call [`Connection::refresh`] from their render path
//! and re-render only when it reports a change.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::reactive::Subscription;
use crate::select::{ChangeFlags, ChangeTracker, EvaluationPlan};
use crate::store::Store;

/// Derived values for one binding site.
pub struct Connection<S: 'static, P, V> {
    plan: Arc<EvaluationPlan<S, P, V>>,
    store: Option<Store<S>>,
    props: Option<P>,
    values: IndexMap<String, V>,
    dirty: Arc<AtomicBool>,
    subscription: Option<Subscription>,
}

impl<S, P, V> Connection<S, P, V>
where
    S: Send + Sync + 'static,
    P: PartialEq,
    V: PartialEq,
{
    /// Create an unbound connection. Nothing is evaluated until the first
    /// [`refresh`](Self::refresh).
    pub fn new(plan: impl Into<Arc<EvaluationPlan<S, P, V>>>) -> Self {
        Self {
            plan: plan.into(),
            store: None,
            props: None,
            values: IndexMap::new(),
            dirty: Arc::new(AtomicBool::new(false)),
            subscription: None,
        }
    }

    /// The flags the next refresh with these inputs would use.
    pub fn flags(&self, store: &Store<S>, props: &P) -> ChangeFlags {
        ChangeFlags {
            state_changed: self.dirty.load(Ordering::Acquire),
            props_changed: self.props.as_ref() != Some(props),
            store_changed: self.store.as_ref().map_or(true, |s| !s.ptr_eq(store)),
        }
    }

    /// Re-evaluate what the inputs require.
    ///
    /// Returns `true` if any derived value was added or changed.
    pub fn refresh(&mut self, store: &Store<S>, props: P) -> bool {
        // Take the dirty bit in one step so a commit landing mid-refresh
        // marks the next refresh instead of being cleared.
        let flags = ChangeFlags {
            state_changed: self.dirty.swap(false, Ordering::AcqRel),
            ..self.flags(store, &props)
        };
        if flags.store_changed {
            self.attach(store);
        }

        let mut tracker = ChangeTracker::new(&mut self.values);
        self.plan.evaluate(&mut tracker, store, &props, flags);
        let changed = tracker.changed();

        tracing::trace!(?flags, changed, "connection refreshed");
        self.props = Some(props);
        changed
    }

    /// True if the store committed since the last refresh.
    pub fn is_stale(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn values(&self) -> &IndexMap<String, V> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    /// Stop listening to the store. The next refresh re-attaches and
    /// recomputes everything.
    pub fn disconnect(&mut self) {
        self.subscription = None;
        self.store = None;
    }

    fn attach(&mut self, store: &Store<S>) {
        let dirty = Arc::clone(&self.dirty);
        // Replacing the old guard detaches from the previous store.
        self.subscription = Some(
            store
                .state_changed()
                .subscribe(move |_| dirty.store(true, Ordering::Release)),
        );
        self.store = Some(store.clone());
    }
}

impl<S: 'static, P: fmt::Debug, V: fmt::Debug> fmt::Debug for Connection<S, P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("props", &self.props)
            .field("values", &self.values)
            .field("attached", &self.subscription.is_some())
            .finish()
    }
}
