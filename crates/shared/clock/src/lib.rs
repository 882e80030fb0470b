//! Quarry Clock Infrastructure
//!
//! Deterministic virtual time for allocator simulations.
//!
//! ## Model
//!
//! ```text
//! VirtualClock
//!     │
//!     ├── paused:  time frozen, only `advance` moves it
//!     ├── running: time follows the wall clock from its last frozen value
//!     │
//!     ├── timers   (timer, sleep) ── fire when virtual time reaches their deadline
//!     └── work     (WorkGuard) ── every dispatched unit of work holds one
//! ```
//!
//! `settle` is the barrier: it returns once no `WorkGuard` is outstanding and
//! no timer is due.
//!
//! ## Usage
//!
//! ```ignore
//! use quarry_clock::{TimeControl, VirtualClock};
//! use chrono::Duration;
//!
//! let clock = VirtualClock::new(None);
//! clock.pause();
//!
//! // Dispatch work carrying a guard; settle waits for it
//! let guard = clock.track();
//! tokio::spawn(async move { /* ... */ drop(guard); });
//! clock.settle().await;
//!
//! // Fire the periodic allocation timer deterministically
//! clock.advance(Duration::seconds(1))?;
//! clock.settle().await;
//! ```

mod error;
mod virtual_clock;
mod work;

pub use error::ClockError;
pub use virtual_clock::{Timer, VirtualClock};
pub use work::WorkGuard;

// Re-export the clock ports for convenience
pub use quarry_ports::{Clock, TimeControl};
