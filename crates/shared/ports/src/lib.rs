//! Quarry Ports
//!
//! Port definitions (traits) for the allocator benchmark harness.
//! These define the boundaries between the simulation driver, the virtual
//! clock and the allocator-under-test.

mod allocator;
mod clock;
mod error;

pub use allocator::{Allocator, AllocatorOptions, OfferMap, OfferSink, SorterOptions};
pub use clock::{Clock, TimeControl};
pub use error::{AllocatorError, AllocatorResult};
