//! Selector taxonomy.
//!
//! A selector derives a value of type `V` from the state `S` and, optionally,
//! from caller-supplied props `P`. Every selector is built through a tagged
//! constructor, and the tag alone decides whether it is props-aware:
//!
//! | constructor             | variant     | props-aware                     |
//! |-------------------------|-------------|---------------------------------|
//! | [`Selector::state`]     | `State`     | no                              |
//! | [`Selector::props`]     | `Props`     | yes                             |
//! | [`Selector::factory`]   | `Factory`   | whatever the produced one is    |
//! | [`Selector::composite`] | `Composite` | if any dependency is            |
//!
//! A props-aware function must be registered with [`Selector::props`] even if
//! it happens to ignore its props today. Registering it with
//! [`Selector::state`] makes the state-map evaluator skip it when only the
//! props change, and it will silently serve stale values.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::memo::Memo;

type StateFn<S, V> = Arc<dyn Fn(&S) -> V + Send + Sync>;
type PropsFn<S, P, V> = Arc<dyn Fn(&S, &P) -> V + Send + Sync>;
type FactoryFn<S, P, V> = Box<dyn FnOnce() -> Selector<S, P, V> + Send>;

/// A selector as registered by the caller.
pub enum Selector<S, P, V> {
    /// Pure function of the state.
    State(StateFn<S, V>),
    /// Pure function of the state and the props.
    Props(PropsFn<S, P, V>),
    /// Produces the real selector on first use.
    Factory(FactoryFn<S, P, V>),
    /// Combines the outputs of other selectors.
    Composite(Composite<S, P, V>),
}

impl<S: 'static, P: 'static, V: 'static> Selector<S, P, V> {
    /// A selector reading only the state.
    pub fn state<F>(f: F) -> Self
    where
        F: Fn(&S) -> V + Send + Sync + 'static,
    {
        Selector::State(Arc::new(f))
    }

    /// A selector reading the state and the props.
    pub fn props<F>(f: F) -> Self
    where
        F: Fn(&S, &P) -> V + Send + Sync + 'static,
    {
        Selector::Props(Arc::new(f))
    }

    /// A selector constructed lazily, once per registration.
    ///
    /// Use this to give every registration its own memoized composite.
    pub fn factory<F>(make: F) -> Self
    where
        F: FnOnce() -> Selector<S, P, V> + Send + 'static,
    {
        Selector::Factory(Box::new(make))
    }

    /// A memoized selector combining the outputs of `deps`.
    ///
    /// Dependencies are resolved immediately. The combiner only runs when
    /// the dependency outputs differ from the previous evaluation.
    pub fn composite<D, F>(deps: Vec<Selector<S, P, D>>, combine: F) -> Self
    where
        D: Clone + PartialEq + Send + Sync + 'static,
        V: Clone + Send + Sync,
        F: Fn(&[D]) -> V + Send + Sync + 'static,
    {
        let deps: Vec<ResolvedSelector<S, P, D>> =
            deps.into_iter().map(Selector::resolve).collect();
        let uses_props = deps.iter().any(ResolvedSelector::uses_props);
        let dependencies = deps.len();
        let memo: Memo<SmallVec<[D; 4]>, V> = Memo::new();

        let eval = move |state: &S, props: &P| {
            let inputs: SmallVec<[D; 4]> =
                deps.iter().map(|dep| dep.evaluate(state, props)).collect();
            memo.get_or_compute(inputs, |inputs| combine(inputs.as_slice()))
        };

        Selector::Composite(Composite {
            uses_props,
            dependencies,
            eval: Arc::new(eval),
        })
    }

    /// A memoized selector combining two selectors of different types.
    pub fn combine2<A, B, F>(a: Selector<S, P, A>, b: Selector<S, P, B>, combine: F) -> Self
    where
        A: Clone + PartialEq + Send + Sync + 'static,
        B: Clone + PartialEq + Send + Sync + 'static,
        V: Clone + Send + Sync,
        F: Fn(&A, &B) -> V + Send + Sync + 'static,
    {
        let a = a.resolve();
        let b = b.resolve();
        let uses_props = a.uses_props() || b.uses_props();
        let memo: Memo<(A, B), V> = Memo::new();

        let eval = move |state: &S, props: &P| {
            let inputs = (a.evaluate(state, props), b.evaluate(state, props));
            memo.get_or_compute(inputs, |(a, b)| combine(a, b))
        };

        Selector::Composite(Composite {
            uses_props,
            dependencies: 2,
            eval: Arc::new(eval),
        })
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, Selector::Factory(_))
    }

    /// Props-awareness, or `None` for a factory that has not been resolved.
    pub fn uses_props(&self) -> Option<bool> {
        match self {
            Selector::State(_) => Some(false),
            Selector::Props(_) => Some(true),
            Selector::Factory(_) => None,
            Selector::Composite(c) => Some(c.uses_props),
        }
    }

    /// Run factories until a concrete selector comes out.
    pub fn resolve(self) -> ResolvedSelector<S, P, V> {
        let mut selector = self;
        loop {
            selector = match selector {
                Selector::State(f) => return ResolvedSelector::State(f),
                Selector::Props(f) => return ResolvedSelector::Props(f),
                Selector::Composite(c) => return ResolvedSelector::Composite(c),
                Selector::Factory(make) => make(),
            };
        }
    }
}

impl<S, P, V> fmt::Debug for Selector<S, P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::State(_) => f.write_str("Selector::State"),
            Selector::Props(_) => f.write_str("Selector::Props"),
            Selector::Factory(_) => f.write_str("Selector::Factory"),
            Selector::Composite(c) => f
                .debug_struct("Selector::Composite")
                .field("uses_props", &c.uses_props)
                .finish(),
        }
    }
}

/// A selector derived from other selectors.
pub struct Composite<S, P, V> {
    uses_props: bool,
    dependencies: usize,
    eval: PropsFn<S, P, V>,
}

impl<S, P, V> Composite<S, P, V> {
    pub fn uses_props(&self) -> bool {
        self.uses_props
    }

    pub fn dependencies(&self) -> usize {
        self.dependencies
    }
}

impl<S, P, V> Clone for Composite<S, P, V> {
    fn clone(&self) -> Self {
        Self {
            uses_props: self.uses_props,
            dependencies: self.dependencies,
            eval: Arc::clone(&self.eval),
        }
    }
}

/// A selector with its factory, if any, already run.
///
/// This is what evaluation plans and [`Store::select`](crate::store::Store::select)
/// work with. Cloning shares the underlying function and memo.
pub enum ResolvedSelector<S, P, V> {
    State(StateFn<S, V>),
    Props(PropsFn<S, P, V>),
    Composite(Composite<S, P, V>),
}

impl<S, P, V> ResolvedSelector<S, P, V> {
    /// Whether the value depends on the props. Fixed at construction.
    pub fn uses_props(&self) -> bool {
        match self {
            ResolvedSelector::State(_) => false,
            ResolvedSelector::Props(_) => true,
            ResolvedSelector::Composite(c) => c.uses_props,
        }
    }

    /// Compute the derived value. State-only selectors ignore `props`.
    pub fn evaluate(&self, state: &S, props: &P) -> V {
        match self {
            ResolvedSelector::State(f) => f(state),
            ResolvedSelector::Props(f) => f(state, props),
            ResolvedSelector::Composite(c) => (c.eval)(state, props),
        }
    }
}

impl<S, P, V> Clone for ResolvedSelector<S, P, V> {
    fn clone(&self) -> Self {
        match self {
            ResolvedSelector::State(f) => ResolvedSelector::State(Arc::clone(f)),
            ResolvedSelector::Props(f) => ResolvedSelector::Props(Arc::clone(f)),
            ResolvedSelector::Composite(c) => ResolvedSelector::Composite(c.clone()),
        }
    }
}

impl<S, P, V> fmt::Debug for ResolvedSelector<S, P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ResolvedSelector::State(_) => "State",
            ResolvedSelector::Props(_) => "Props",
            ResolvedSelector::Composite(_) => "Composite",
        };
        f.debug_struct("ResolvedSelector")
            .field("kind", &kind)
            .field("uses_props", &self.uses_props())
            .finish()
    }
}
