//! Write Window
//!
//! The write window is the lock that decides whether a container's state may
//! be replaced. It is closed by default and opened only for the duration of a
//! bound reducer or selector call.
//!
//! # Implementation
//!
//! Each container owns its own window. The window is a re-entrant mutex
//! around a depth counter: opening pushes one level, dropping the guard pops
//! it. Nested calls on the same thread (a reducer invoking another reducer,
//! a selector reading through another selector) therefore keep the window
//! open until the outermost guard is gone, while another thread trying to
//! open the same window waits for it.
//!
//! The guard pops its level in `Drop`, so the window is closed again even if
//! the body returns an error or panics.

use std::cell::Cell;
use std::fmt;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Per-container write lock.
pub struct WriteWindow {
    depth: ReentrantMutex<Cell<usize>>,
}

impl WriteWindow {
    pub fn new() -> Self {
        Self {
            depth: ReentrantMutex::new(Cell::new(0)),
        }
    }

    /// Open the window until the returned guard is dropped.
    pub fn open(&self) -> WindowGuard<'_> {
        let guard = self.depth.lock();
        guard.set(guard.get() + 1);
        WindowGuard { guard }
    }

    /// True if the calling thread currently holds the window open.
    ///
    /// Returns `false` when another thread holds it.
    pub fn is_open(&self) -> bool {
        self.depth
            .try_lock()
            .map(|depth| depth.get() > 0)
            .unwrap_or(false)
    }

    /// Nesting depth as seen from the calling thread.
    pub fn depth(&self) -> usize {
        self.depth.try_lock().map(|depth| depth.get()).unwrap_or(0)
    }
}

impl Default for WriteWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WriteWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteWindow")
            .field("depth", &self.depth())
            .finish()
    }
}

/// Guard that closes one level of the window when dropped.
pub struct WindowGuard<'a> {
    guard: ReentrantMutexGuard<'a, Cell<usize>>,
}

impl WindowGuard<'_> {
    /// True if this guard is the outermost level.
    pub fn is_outermost(&self) -> bool {
        self.guard.get() == 1
    }
}

impl Drop for WindowGuard<'_> {
    fn drop(&mut self) {
        let depth = self.guard.get();
        debug_assert!(depth > 0, "write window closed more often than opened");
        self.guard.set(depth.saturating_sub(1));
    }
}
