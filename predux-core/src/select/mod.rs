//! Selectors and State Maps
//!
//! Selectors derive values from the store's state and, when props-aware,
//! from caller-supplied props. A [`StateMap`] names a set of selectors and
//! compiles into an [`EvaluationPlan`] that recomputes only the entries the
//! current [`ChangeFlags`] can have affected.

mod memo;
mod selector;
mod state_map;
mod target;

pub use memo::{Memo, MemoState};
pub use selector::{Composite, ResolvedSelector, Selector};
pub use state_map::{init_state_map, ChangeFlags, EvaluationPlan, PlanEntry, StateMap};
pub use target::{ChangeTracker, Target};
