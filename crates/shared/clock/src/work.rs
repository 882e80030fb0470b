use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Counter of in-flight work, shared by the clock and its guards
#[derive(Debug, Default)]
pub(crate) struct WorkTracker {
    outstanding: AtomicUsize,
    idle: Notify,
}

impl WorkTracker {
    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub(crate) fn idle(&self) -> &Notify {
        &self.idle
    }
}

/// Marks one unit of dispatched work as pending until dropped
///
/// Carry the guard alongside the work (e.g. in the channel message) and drop
/// it once the work is processed. `VirtualClock::settle` waits for all guards.
#[derive(Debug)]
pub struct WorkGuard {
    tracker: Arc<WorkTracker>,
}

impl WorkGuard {
    pub(crate) fn new(tracker: Arc<WorkTracker>) -> Self {
        tracker.outstanding.fetch_add(1, Ordering::AcqRel);
        Self { tracker }
    }
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        if self.tracker.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}
