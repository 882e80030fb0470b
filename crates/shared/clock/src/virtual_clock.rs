use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, trace};
use priority_queue::PriorityQueue;
use quarry_core::Timestamp;
use quarry_ports::{Clock, TimeControl};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::{Notify, oneshot};

use crate::error::{ClockError, ClockResult};
use crate::work::{WorkGuard, WorkTracker};

type TimerId = u64;

struct ClockState {
    paused: bool,
    /// Virtual time at `anchor`
    base: Timestamp,
    /// Wall-clock instant `base` was recorded at
    anchor: Instant,
    /// Pending timers, earliest deadline first (ties in registration order)
    timers: PriorityQueue<TimerId, Reverse<(Timestamp, TimerId)>>,
    wakers: HashMap<TimerId, oneshot::Sender<WorkGuard>>,
    next_timer: TimerId,
}

impl ClockState {
    fn now(&self) -> Timestamp {
        if self.paused {
            self.base
        } else {
            let elapsed = Duration::from_std(self.anchor.elapsed()).unwrap_or(Duration::zero());
            later(self.base, elapsed)
        }
    }
}

/// `time + duration`, saturating at the latest representable time
fn later(time: Timestamp, duration: Duration) -> Timestamp {
    time.checked_add_signed(duration).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Deterministic simulation clock - the only source of time in a run
///
/// While running, virtual time follows the wall clock. While paused it is
/// frozen and moves only through `advance`, which fires every timer whose
/// deadline it passes. Work dispatched through the clock (`track`, `sleep`)
/// is counted so `settle` can act as a barrier without real-time waiting.
pub struct VirtualClock {
    name: String,
    state: Mutex<ClockState>,
    /// Signalled on pause, resume and advance
    changed: Notify,
    work: Arc<WorkTracker>,
}

impl VirtualClock {
    /// Create a running clock
    ///
    /// # Arguments
    /// * `initial_time` - Optional starting time. If None, uses current wall time.
    pub fn new(initial_time: Option<Timestamp>) -> Arc<Self> {
        Self::with_state(initial_time, false)
    }

    /// Create a clock that starts frozen
    pub fn new_paused(initial_time: Option<Timestamp>) -> Arc<Self> {
        Self::with_state(initial_time, true)
    }

    fn with_state(initial_time: Option<Timestamp>, paused: bool) -> Arc<Self> {
        Arc::new(Self {
            name: "VirtualClock".to_string(),
            state: Mutex::new(ClockState {
                paused,
                base: initial_time.unwrap_or_else(Utc::now),
                anchor: Instant::now(),
                timers: PriorityQueue::new(),
                wakers: HashMap::new(),
                next_timer: 0,
            }),
            changed: Notify::new(),
            work: Arc::new(WorkTracker::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register one unit of pending work; `settle` waits until it is dropped
    pub fn track(&self) -> WorkGuard {
        WorkGuard::new(self.work.clone())
    }

    /// Number of work guards currently alive
    pub fn outstanding_work(&self) -> usize {
        self.work.outstanding()
    }

    /// Number of timers waiting for their deadline
    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }

    /// Move a paused clock forward, firing every timer that becomes due
    pub fn advance(&self, duration: Duration) -> ClockResult<()> {
        if duration < Duration::zero() {
            return Err(ClockError::NegativeAdvance(duration));
        }

        {
            let mut state = self.lock();
            if !state.paused {
                return Err(ClockError::NotPaused);
            }
            state.base = state
                .base
                .checked_add_signed(duration)
                .ok_or(ClockError::Overflow(duration))?;
            trace!("Advanced virtual time by {}ms to {}", duration.num_milliseconds(), state.base);
            self.fire_due(&mut state);
        }

        self.changed.notify_waiters();
        Ok(())
    }

    /// Register a timer due `duration` from now
    ///
    /// The deadline is fixed at registration, before the timer is awaited.
    /// Deadlines past the latest representable time are clamped to it.
    pub fn timer(self: &Arc<Self>, duration: Duration) -> Timer {
        let mut state = self.lock();
        let id = state.next_timer;
        state.next_timer += 1;

        let deadline = later(state.now(), duration);
        let (tx, rx) = oneshot::channel();
        state.timers.push(id, Reverse((deadline, id)));
        state.wakers.insert(id, tx);
        self.fire_due(&mut state);

        Timer {
            clock: self.clone(),
            id,
            deadline,
            fired: rx,
        }
    }

    /// Wait until virtual time has moved `duration` past now
    ///
    /// The returned guard keeps the timer's follow-up work pending for
    /// `settle` until the caller drops it.
    pub async fn sleep(self: &Arc<Self>, duration: Duration) -> WorkGuard {
        self.timer(duration).wait().await
    }

    fn fire_due(&self, state: &mut ClockState) {
        let now = state.now();
        while let Some((_, Reverse((deadline, _)))) = state.timers.peek() {
            if *deadline > now {
                break;
            }
            let Some((id, _)) = state.timers.pop() else {
                break;
            };
            if let Some(waker) = state.wakers.remove(&id) {
                // A dropped receiver hands the guard back and it is released here
                let _ = waker.send(self.track());
            }
        }
    }

    fn cancel_timer(&self, id: TimerId) {
        let mut state = self.lock();
        state.timers.remove(&id);
        state.wakers.remove(&id);
    }
}

/// A pending virtual-time deadline
///
/// Dropping an unfired timer unregisters it.
pub struct Timer {
    clock: Arc<VirtualClock>,
    id: TimerId,
    deadline: Timestamp,
    fired: oneshot::Receiver<WorkGuard>,
}

impl Timer {
    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }

    /// Wait for the deadline; the guard keeps follow-up work pending for `settle`
    pub async fn wait(mut self) -> WorkGuard {
        let clock = self.clock.clone();

        loop {
            let changed = clock.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            // Wall-clock time until the deadline; frozen clocks never get there on their own
            let remaining = {
                let state = clock.lock();
                if state.paused {
                    None
                } else {
                    Some((self.deadline - state.now()).to_std().unwrap_or_default())
                }
            };

            tokio::select! {
                guard = &mut self.fired => {
                    return match guard {
                        Ok(guard) => guard,
                        Err(_) => clock.track(),
                    };
                }
                _ = &mut changed => {}
                _ = wall_clock_wait(remaining) => {
                    let mut state = clock.lock();
                    clock.fire_due(&mut state);
                }
            }
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.clock.cancel_timer(self.id);
    }
}

async fn wall_clock_wait(remaining: Option<std::time::Duration>) {
    match remaining {
        Some(remaining) => tokio::time::sleep(remaining).await,
        None => std::future::pending().await,
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Timestamp {
        self.lock().now()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl TimeControl for VirtualClock {
    fn paused(&self) -> bool {
        self.lock().paused
    }

    fn pause(&self) {
        {
            let mut state = self.lock();
            if state.paused {
                return;
            }
            state.base = state.now();
            state.paused = true;
            debug!("Virtual clock paused at {}", state.base);
        }
        self.changed.notify_waiters();
    }

    fn resume(&self) {
        {
            let mut state = self.lock();
            if !state.paused {
                return;
            }
            state.anchor = Instant::now();
            state.paused = false;
            debug!("Virtual clock resumed at {}", state.base);
        }
        self.changed.notify_waiters();
    }

    async fn settle(&self) {
        loop {
            let idle = self.work.idle().notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            {
                let mut state = self.lock();
                self.fire_due(&mut state);
            }

            if self.work.outstanding() == 0 {
                return;
            }
            idle.await;
        }
    }
}
