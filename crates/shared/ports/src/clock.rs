use async_trait::async_trait;
use quarry_core::Timestamp;

/// Read-only view of benchmark time
///
/// Allocators see simulated time only through this trait: allocation
/// deadlines are computed from `now`, never from the host clock, so a
/// paused benchmark run replays identically however fast it executes.
pub trait Clock: Send + Sync {
    /// Current simulated time
    fn now(&self) -> Timestamp;

    /// Shown in log lines
    fn name(&self) -> &str {
        "Clock"
    }
}

/// Port for controlling deterministic virtual time
///
/// Pausing freezes time-triggered activity; `settle` is the barrier that
/// returns only once all work enqueued so far has been processed.
#[async_trait]
pub trait TimeControl: Clock {
    /// Whether time is currently frozen
    fn paused(&self) -> bool;

    /// Freeze time at its current value
    fn pause(&self);

    /// Let time follow the wall clock again from its frozen value
    fn resume(&self);

    /// Wait until every pending unit of tracked work has completed
    async fn settle(&self);
}
