//! Memo Cell
//!
//! A Memo caches the last result of a computation together with the inputs
//! it was computed from. When asked again with equal inputs it returns the
//! cached result without running the computation.
//!
//! # How Memos Work
//!
//! 1. A fresh memo is `Dirty`: it has no cached value.
//!
//! 2. `get_or_compute` compares the new inputs with the cached ones. On a
//!    match the memo is `Clean` and the cached value is returned.
//!
//! 3. Otherwise the computation runs, and the inputs and result replace the
//!    cache.
//!
//! Only the last input set is remembered. Composite selectors use one memo
//! each, so a selector shared between two registration sites with different
//! props thrashes its cache; a factory gives each site its own memo.
//!
//! # Thread Safety
//!
//! The cache sits behind a `parking_lot::Mutex` that is released while the
//! computation runs.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// A value is cached for the last inputs.
    Clean,

    /// Nothing is cached; the next access computes.
    Dirty,
}

/// Single-entry cache keyed by the computation's inputs.
pub struct Memo<K, V> {
    cache: Mutex<Option<(K, V)>>,
    computations: AtomicU64,
}

impl<K, V> Memo<K, V>
where
    K: PartialEq,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(None),
            computations: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `inputs`, computing it if they changed.
    pub fn get_or_compute<F>(&self, inputs: K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some((cached_inputs, value)) = self.cache.lock().as_ref() {
            if *cached_inputs == inputs {
                return value.clone();
            }
        }

        let value = compute(&inputs);
        self.computations.fetch_add(1, Ordering::Relaxed);
        *self.cache.lock() = Some((inputs, value.clone()));
        value
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    pub fn state(&self) -> MemoState {
        if self.cache.lock().is_some() {
            MemoState::Clean
        } else {
            MemoState::Dirty
        }
    }

    /// How many times the computation has run.
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }
}

impl<K, V> Default for Memo<K, V>
where
    K: PartialEq,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Debug for Memo<K, V>
where
    K: PartialEq,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("state", &self.state())
            .field("computations", &self.computations())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
