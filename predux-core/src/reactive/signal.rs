//! Signal Implementation
//!
//! A Signal is the synchronous multicast primitive of the store. It holds an
//! ordered list of listeners and invokes them, in registration order, every
//! time it is emitted.
//!
//! # How Signals Work
//!
//! 1. `on` appends a listener and returns its [`ListenerId`]. Registering the
//!    same closure twice gives two registrations.
//!
//! 2. `emit` snapshots the listener list, releases the lock and walks the
//!    snapshot. Before each call it checks the registration's attachment
//!    flag, cleared by `off`, so a listener removed by an earlier one in the
//!    same emission is skipped. Listeners added during emission are first called
//!    on the next emission.
//!
//! 3. Each invocation is isolated: a panicking listener is caught, logged and
//!    reported in the returned [`EmitError`] once every listener has run.
//!
//! # Thread Safety
//!
//! The listener list sits behind a `parking_lot::RwLock` that is never held
//! while user code runs, so listeners may freely call `on`/`off` on the
//! signal that is notifying them.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::subscriber::{Listener, ListenerId};
use crate::error::{EmitError, ListenerFailure};

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct SignalInner<A> {
    id: u64,
    listeners: RwLock<Vec<Listener<A>>>,
}

impl<A> SignalInner<A> {
    fn contains(&self, id: ListenerId) -> bool {
        self.listeners.read().iter().any(|l| l.id() == id)
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|l| l.id() == id) {
            Some(index) => {
                listeners.remove(index).detach();
                true
            }
            None => false,
        }
    }
}

/// Type-erased detach hook so [`Subscription`] does not carry `A`.
trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId) -> bool;
}

impl<A: 'static> Detach for SignalInner<A> {
    fn detach(&self, id: ListenerId) -> bool {
        self.remove(id)
    }
}

/// A synchronous multicast event channel carrying arguments of type `A`.
///
/// Cloning a `Signal` yields another handle to the same listener list.
///
/// # Example
///
/// ```rust
/// use predux_core::reactive::Signal;
///
/// let changed: Signal<u32> = Signal::new();
/// let id = changed.on(|n| println!("got {n}"));
/// changed.emit(&1).unwrap();
/// changed.off(id);
/// ```
pub struct Signal<A: 'static = ()> {
    inner: Arc<SignalInner<A>>,
}

impl<A: 'static> Signal<A> {
    /// Create a signal with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: next_signal_id(),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Append a listener. Duplicates are not collapsed.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.attach(Listener::new(listener))
    }

    /// Append an already constructed listener.
    pub fn attach(&self, listener: Listener<A>) -> ListenerId {
        let id = listener.id();
        self.inner.listeners.write().push(listener.register());
        tracing::trace!(signal = self.inner.id, %id, "listener attached");
        id
    }

    /// Remove a registration. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            tracing::trace!(signal = self.inner.id, %id, "listener detached");
        }
        removed
    }

    /// Attach a listener that is detached when the returned guard drops.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = self.on(listener);
        let inner: Arc<dyn Detach> = self.inner.clone();
        Subscription {
            id,
            signal: Some(Arc::downgrade(&inner)),
        }
    }

    /// Check whether a registration is still attached.
    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.inner.contains(id)
    }

    /// Invoke every registered listener with `args`.
    ///
    /// All listeners run even if some panic; the panics are returned
    /// together once the emission is complete.
    pub fn emit(&self, args: &A) -> Result<(), EmitError> {
        let snapshot: SmallVec<[Listener<A>; 8]> =
            self.inner.listeners.read().iter().cloned().collect();

        if snapshot.is_empty() {
            return Ok(());
        }

        tracing::trace!(signal = self.inner.id, listeners = snapshot.len(), "emit");

        let mut invoked = 0;
        let mut failures = Vec::new();

        for listener in &snapshot {
            // Removed by an earlier listener in this emission.
            if !listener.is_attached() {
                continue;
            }

            invoked += 1;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.notify(args))) {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    signal = self.inner.id,
                    listener = %listener.id(),
                    %message,
                    "listener panicked during emit"
                );
                failures.push(ListenerFailure {
                    listener: listener.id(),
                    message,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(EmitError { invoked, failures })
        }
    }

    /// Get the number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if both handles refer to the same signal.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: 'static> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("listener_count", &self.len())
            .finish()
    }
}

/// Guard that detaches its listener when dropped.
///
/// Holds only a weak reference, so it never keeps the signal alive.
#[must_use = "dropping a Subscription detaches the listener immediately"]
pub struct Subscription {
    id: ListenerId,
    signal: Option<Weak<dyn Detach>>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Detach now. Returns `false` if the listener or signal was already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.detach()
    }

    /// Keep the listener attached for the lifetime of the signal.
    pub fn forget(mut self) {
        self.signal = None;
    }

    fn detach(&mut self) -> bool {
        self.signal
            .take()
            .and_then(|weak| weak.upgrade())
            .map(|signal| signal.detach(self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.signal.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicI32;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn Fn(&()) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let make = move |name: &'static str| {
            let log = log_clone.clone();
            Box::new(move |_: &()| log.lock().push(name)) as Box<dyn Fn(&()) + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let signal: Signal = Signal::new();
        assert!(signal.is_empty());
        assert!(signal.emit(&()).is_ok());
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let signal: Signal = Signal::new();
        let (log, make) = recorder();

        signal.on(make("a"));
        signal.on(make("b"));
        signal.on(make("c"));
        signal.emit(&()).unwrap();

        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_registrations_are_kept() {
        let signal: Signal<i32> = Signal::new();
        let total = Arc::new(AtomicI32::new(0));

        for _ in 0..2 {
            let total = total.clone();
            signal.on(move |n| {
                total.fetch_add(*n, Ordering::SeqCst);
            });
        }

        signal.emit(&5).unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 10);
        assert_eq!(signal.len(), 2);
    }

    #[test]
    fn off_unknown_listener_is_noop() {
        let signal: Signal = Signal::new();
        let id = signal.on(|_| {});
        assert!(signal.off(id));
        assert!(!signal.off(id));
        assert!(!signal.off(ListenerId::new()));
    }

    #[test]
    fn listener_removed_during_emit_is_skipped() {
        let signal: Signal = Signal::new();
        let (log, make) = recorder();
        let b_id = Arc::new(Mutex::new(None::<ListenerId>));

        let signal_clone = signal.clone();
        let b_id_clone = b_id.clone();
        let log_a = log.clone();
        signal.on(move |_| {
            log_a.lock().push("a");
            if let Some(id) = *b_id_clone.lock() {
                signal_clone.off(id);
            }
        });
        *b_id.lock() = Some(signal.on(make("b")));
        signal.on(make("c"));

        signal.emit(&()).unwrap();
        assert_eq!(*log.lock(), vec!["a", "c"]);
    }

    #[test]
    fn removing_one_of_two_attachments_keeps_the_other() {
        let signal: Signal<i32> = Signal::new();
        let total = Arc::new(AtomicI32::new(0));

        let total_clone = total.clone();
        let listener = Listener::new(move |n: &i32| {
            total_clone.fetch_add(*n, Ordering::SeqCst);
        });
        let id = signal.attach(listener.clone());
        signal.attach(listener);

        assert!(signal.off(id));
        signal.emit(&3).unwrap();

        assert_eq!(total.load(Ordering::SeqCst), 3);
        assert!(signal.is_registered(id));
    }

    #[test]
    fn listener_added_during_emit_runs_next_time() {
        let signal: Signal = Signal::new();
        let (log, make) = recorder();
        let added = Arc::new(AtomicI32::new(0));

        let signal_clone = signal.clone();
        let added_clone = added.clone();
        let make_late = Arc::new(make);
        let make_late_clone = make_late.clone();
        signal.on(move |_| {
            if added_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                signal_clone.on(make_late_clone("late"));
            }
        });

        signal.emit(&()).unwrap();
        assert!(log.lock().is_empty());

        signal.emit(&()).unwrap();
        assert_eq!(*log.lock(), vec!["late"]);
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let signal: Signal = Signal::new();
        let (log, make) = recorder();

        signal.on(make("a"));
        let bad = signal.on(|_| panic!("listener exploded"));
        signal.on(make("c"));

        let err = signal.emit(&()).unwrap_err();
        assert_eq!(*log.lock(), vec!["a", "c"]);
        assert_eq!(err.invoked, 3);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].listener, bad);
        assert_eq!(err.failures[0].message, "listener exploded");
    }

    #[test]
    fn subscription_detaches_on_drop() {
        let signal: Signal = Signal::new();
        let calls = Arc::new(AtomicI32::new(0));

        {
            let calls = calls.clone();
            let _sub = signal.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
            signal.emit(&()).unwrap();
        }

        signal.emit(&()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(signal.is_empty());
    }

    #[test]
    fn forgotten_subscription_stays_attached() {
        let signal: Signal = Signal::new();
        signal.subscribe(|_| {}).forget();
        assert_eq!(signal.len(), 1);
    }

    #[test]
    fn subscription_outliving_signal_is_harmless() {
        let signal: Signal = Signal::new();
        let sub = signal.subscribe(|_| {});
        drop(signal);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn clone_shares_listeners() {
        let signal1: Signal = Signal::new();
        let signal2 = signal1.clone();

        signal1.on(|_| {});
        assert_eq!(signal2.len(), 1);
        assert!(signal1.ptr_eq(&signal2));
        assert_eq!(signal1.id(), signal2.id());
    }
}
