//! Listener types for the signal bus.
//!
//! A listener is a callback attached to a [`Signal`](super::Signal). Each
//! registration gets its own [`ListenerId`], so attaching the same closure
//! twice yields two independent registrations.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads. IDs are
    /// monotonic, so they also encode registration order.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A registered callback receiving the emitted arguments by reference.
pub struct Listener<A> {
    id: ListenerId,
    callback: Arc<dyn Fn(&A) + Send + Sync>,
    // Shared by every clone of one registration; cleared when it is removed.
    attached: Arc<AtomicBool>,
}

impl<A> Listener<A> {
    /// Wrap a callback under a fresh ID.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self {
            id: ListenerId::new(),
            callback: Arc::new(callback),
            attached: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// False once this registration has been removed from its signal.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// A copy of this listener with its own attachment flag.
    pub(crate) fn register(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
            attached: Arc::new(AtomicBool::new(true)),
        }
    }

    pub(crate) fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    /// Invoke the callback.
    pub fn notify(&self, args: &A) {
        (self.callback)(args);
    }
}

// Manual impl: `A` itself need not be Clone.
impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
            attached: Arc::clone(&self.attached),
        }
    }
}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn listener_ids_are_unique_and_ordered() {
        let id1 = ListenerId::new();
        let id2 = ListenerId::new();
        let id3 = ListenerId::new();

        assert_ne!(id1, id2);
        assert!(id1 < id2);
        assert!(id2 < id3);
    }

    #[test]
    fn listener_notify_passes_arguments() {
        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();

        let listener = Listener::new(move |value: &i32| {
            seen_clone.store(*value, Ordering::SeqCst);
        });

        listener.notify(&7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn cloned_listener_keeps_id() {
        let listener = Listener::new(|_: &()| {});
        let copy = listener.clone();
        assert_eq!(listener.id(), copy.id());

        copy.detach();
        assert!(!listener.is_attached());
    }

    #[test]
    fn registration_gets_its_own_flag() {
        let listener = Listener::new(|_: &()| {});
        let registered = listener.register();

        registered.detach();
        assert!(!registered.is_attached());
        assert!(listener.is_attached());
    }
}
