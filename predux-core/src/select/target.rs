//! Write targets for evaluation plans.
//!
//! The evaluator never keeps derived values itself; it writes them into a
//! caller-owned target keyed by the state-map key.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use indexmap::IndexMap;

/// Something derived values can be written into.
pub trait Target<V> {
    /// Store `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: V);
}

impl<V, H: BuildHasher> Target<V> for IndexMap<String, V, H> {
    fn write(&mut self, key: &str, value: V) {
        match self.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                self.insert(key.to_string(), value);
            }
        }
    }
}

impl<V, H: BuildHasher> Target<V> for HashMap<String, V, H> {
    fn write(&mut self, key: &str, value: V) {
        match self.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                self.insert(key.to_string(), value);
            }
        }
    }
}

impl<V> Target<V> for BTreeMap<String, V> {
    fn write(&mut self, key: &str, value: V) {
        match self.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                self.insert(key.to_string(), value);
            }
        }
    }
}

impl<V, T: Target<V> + ?Sized> Target<V> for &mut T {
    fn write(&mut self, key: &str, value: V) {
        (**self).write(key, value);
    }
}

/// Wraps a target and records whether any write changed a value.
pub struct ChangeTracker<'a, V> {
    values: &'a mut IndexMap<String, V>,
    changed: bool,
    writes: usize,
}

impl<'a, V: PartialEq> ChangeTracker<'a, V> {
    pub fn new(values: &'a mut IndexMap<String, V>) -> Self {
        Self {
            values,
            changed: false,
            writes: 0,
        }
    }

    /// True if a key was added or a value differs from the previous one.
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl<V: PartialEq> Target<V> for ChangeTracker<'_, V> {
    fn write(&mut self, key: &str, value: V) {
        self.writes += 1;
        match self.values.get_mut(key) {
            Some(slot) if *slot == value => {}
            Some(slot) => {
                *slot = value;
                self.changed = true;
            }
            None => {
                self.values.insert(key.to_string(), value);
                self.changed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_map_keeps_first_insertion_position() {
        let mut target: IndexMap<String, i32> = IndexMap::new();
        target.write("a", 1);
        target.write("b", 2);
        target.write("a", 3);

        let pairs: Vec<_> = target.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(pairs, vec![("a", 3), ("b", 2)]);
    }

    #[test]
    fn tracker_ignores_equal_writes() {
        let mut values: IndexMap<String, i32> = IndexMap::new();
        values.insert("a".into(), 1);

        let mut tracker = ChangeTracker::new(&mut values);
        tracker.write("a", 1);
        assert!(!tracker.changed());
        assert_eq!(tracker.writes(), 1);

        tracker.write("a", 2);
        assert!(tracker.changed());
        assert_eq!(values["a"], 2);
    }

    #[test]
    fn tracker_reports_new_keys() {
        let mut values: IndexMap<String, i32> = IndexMap::new();
        let mut tracker = ChangeTracker::new(&mut values);
        tracker.write("fresh", 0);
        assert!(tracker.changed());
    }
}
