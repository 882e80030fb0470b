//! Client sorters deciding who is offered resources first
//!
//! The allocator keeps one sorter over roles and, per role, one sorter over
//! the frameworks subscribed to it.

mod drf;
mod random;

pub use drf::DrfSorter;
pub use random::RandomSorter;

use quarry_core::Resources;
use quarry_ports::{AllocatorError, AllocatorResult, SorterOptions};
use rust_decimal::Decimal;

/// Seed for the random sorter so runs stay reproducible
pub const RANDOM_SORTER_SEED: u64 = 42;

/// Orders clients (roles or frameworks) for an allocation round
pub trait Sorter: Send {
    fn name(&self) -> &str;

    /// Start tracking a client; adding twice is a no-op
    fn add(&mut self, client: &str);

    fn contains(&self, client: &str) -> bool;

    fn count(&self) -> usize;

    /// Relative weight of a client (default 1)
    fn set_weight(&mut self, client: &str, weight: Decimal);

    /// Grow the pool shares are computed against
    fn add_total(&mut self, resources: &Resources);

    fn allocated(&mut self, client: &str, resources: &Resources);

    fn unallocated(&mut self, client: &str, resources: &Resources);

    /// Clients in the order they should be offered resources
    fn sort(&mut self) -> Vec<String>;
}

/// Sorter variants selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SorterKind {
    Drf,
    Random,
}

impl SorterKind {
    /// Resolve a sorter name; unknown names are rejected
    pub fn from_name(name: &str) -> AllocatorResult<Self> {
        match name.to_lowercase().as_str() {
            "drf" => Ok(SorterKind::Drf),
            "random" => Ok(SorterKind::Random),
            _ => Err(AllocatorError::UnknownSorter(name.to_string())),
        }
    }

    pub fn build(self, options: Option<&SorterOptions>) -> Box<dyn Sorter> {
        match self {
            SorterKind::Drf => Box::new(DrfSorter::new(options.cloned().unwrap_or_default())),
            SorterKind::Random => Box::new(RandomSorter::new(RANDOM_SORTER_SEED)),
        }
    }
}
