//! State-Map Compiler
//!
//! A state map names the derived values a consumer wants:
//!
//! ```text
//! { "total": state-only, "row": props-aware, "label": props-aware }
//! ```
//!
//! Compiling it produces an [`EvaluationPlan`], an ordered list of entries
//! split in two:
//!
//! ```text
//! [ label, row | total ]
//!   ^^^^^^^^^^   ^^^^^
//!   props-aware  props-independent
//!   0 .. uses_props_until
//! ```
//!
//! Props-aware entries are pushed to the front as they are registered, so
//! the prefix is in reverse registration order; the rest are pushed to the
//! back and stay in registration order.
//!
//! # Recomputation Rule
//!
//! Given the three change flags, the plan evaluates a prefix of itself:
//!
//! - state or store changed: every entry,
//! - only props changed: the props-aware prefix,
//! - nothing changed: nothing, and the target is not touched.
//!
//! The rule is only as good as the classification. A props-dependent
//! selector registered as state-only is never recomputed on a props change.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::selector::{ResolvedSelector, Selector};
use super::target::Target;
use crate::store::Store;

/// Named selectors, in registration order.
///
/// Inserting an existing key replaces its selector but keeps its position.
pub struct StateMap<S, P, V> {
    selectors: IndexMap<String, Selector<S, P, V>>,
}

impl<S: 'static, P: 'static, V: 'static> StateMap<S, P, V> {
    pub fn new() -> Self {
        Self {
            selectors: IndexMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, selector: Selector<S, P, V>) -> Self {
        self.insert(key, selector);
        self
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        selector: Selector<S, P, V>,
    ) -> Option<Selector<S, P, V>> {
        self.selectors.insert(key.into(), selector)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Compile into an evaluation plan. See [`init_state_map`].
    pub fn compile(self) -> EvaluationPlan<S, P, V> {
        init_state_map(self)
    }
}

impl<S: 'static, P: 'static, V: 'static> Default for StateMap<S, P, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, P, V, K> FromIterator<(K, Selector<S, P, V>)> for StateMap<S, P, V>
where
    S: 'static,
    P: 'static,
    V: 'static,
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Selector<S, P, V>)>>(iter: I) -> Self {
        let mut map = StateMap::new();
        for (key, selector) in iter {
            map.insert(key, selector);
        }
        map
    }
}

impl<S, P, V> fmt::Debug for StateMap<S, P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.selectors.iter()).finish()
    }
}

/// Which inputs changed since the previous evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeFlags {
    /// The store committed a new state.
    pub state_changed: bool,
    /// The consumer's own props changed.
    pub props_changed: bool,
    /// The consumer is now bound to a different store.
    pub store_changed: bool,
}

impl ChangeFlags {
    pub const NONE: Self = Self {
        state_changed: false,
        props_changed: false,
        store_changed: false,
    };

    pub fn new(state_changed: bool, props_changed: bool, store_changed: bool) -> Self {
        Self {
            state_changed,
            props_changed,
            store_changed,
        }
    }

    pub fn state() -> Self {
        Self::new(true, false, false)
    }

    pub fn props() -> Self {
        Self::new(false, true, false)
    }

    pub fn store() -> Self {
        Self::new(false, false, true)
    }

    pub fn any(&self) -> bool {
        self.state_changed || self.props_changed || self.store_changed
    }
}

/// One compiled entry.
pub struct PlanEntry<S, P, V> {
    key: Arc<str>,
    selector: ResolvedSelector<S, P, V>,
}

impl<S, P, V> PlanEntry<S, P, V> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn uses_props(&self) -> bool {
        self.selector.uses_props()
    }

    pub fn selector(&self) -> &ResolvedSelector<S, P, V> {
        &self.selector
    }
}

/// The compiled, immutable form of a [`StateMap`].
///
/// Holds no derived values of its own, so one plan can be shared (e.g.
/// behind an `Arc`) by any number of consumers.
pub struct EvaluationPlan<S, P, V> {
    entries: Vec<PlanEntry<S, P, V>>,
    uses_props_until: usize,
}

/// Compile a state map.
///
/// Factories run here, exactly once each. The map is consumed; the plan
/// keeps only the resolved selectors.
pub fn init_state_map<S, P, V>(map: StateMap<S, P, V>) -> EvaluationPlan<S, P, V>
where
    S: 'static,
    P: 'static,
    V: 'static,
{
    let mut entries = VecDeque::with_capacity(map.len());
    let mut uses_props_until = 0;

    for (key, selector) in map.selectors {
        let selector = selector.resolve();
        let entry = PlanEntry {
            key: Arc::from(key),
            selector,
        };

        if entry.uses_props() {
            entries.push_front(entry);
            uses_props_until += 1;
        } else {
            entries.push_back(entry);
        }
    }

    tracing::debug!(
        entries = entries.len(),
        uses_props_until,
        "state map compiled"
    );

    EvaluationPlan {
        entries: entries.into(),
        uses_props_until,
    }
}

impl<S, P, V> EvaluationPlan<S, P, V>
where
    S: Send + Sync + 'static,
{
    /// Number of entries evaluated for the given flags.
    pub fn recompute_until(&self, flags: ChangeFlags) -> usize {
        if flags.state_changed || flags.store_changed {
            self.entries.len()
        } else if flags.props_changed {
            self.uses_props_until
        } else {
            0
        }
    }

    /// Write the entries implied by `flags` into `target`.
    ///
    /// Returns the number of values written. Entries outside the evaluated
    /// prefix keep whatever value the target already holds for them.
    pub fn evaluate<T>(&self, target: &mut T, store: &Store<S>, props: &P, flags: ChangeFlags) -> usize
    where
        T: Target<V> + ?Sized,
    {
        let until = self.recompute_until(flags);
        if until == 0 {
            return 0;
        }

        // Selectors in the plan may use the in-window read.
        let _window = store.open_window();
        let state = store.get_state();
        tracing::trace!(until, len = self.entries.len(), ?flags, "evaluating state map");

        for entry in &self.entries[..until] {
            target.write(&entry.key, entry.selector.evaluate(&state, props));
        }

        until
    }
}

impl<S, P, V> EvaluationPlan<S, P, V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the props-aware prefix.
    pub fn uses_props_until(&self) -> usize {
        self.uses_props_until
    }

    pub fn entries(&self) -> &[PlanEntry<S, P, V>] {
        &self.entries
    }

    /// Keys in evaluation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(PlanEntry::key)
    }
}

impl<S, P, V> fmt::Debug for EvaluationPlan<S, P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationPlan")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .field("uses_props_until", &self.uses_props_until)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
