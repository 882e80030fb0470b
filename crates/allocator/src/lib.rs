//! Quarry Allocator
//!
//! The allocator-under-test for the benchmark harness: a name-keyed factory
//! and a reference hierarchical allocator with pluggable role and framework
//! sorters.

pub mod hierarchical;
pub mod sorter;

pub use hierarchical::{
    AgentSnapshot, AllocatorSnapshot, AllocatorStats, FrameworkSnapshot, HierarchicalAllocator,
};
pub use sorter::{DrfSorter, RandomSorter, Sorter, SorterKind};

// Re-export the trait from ports for convenience
pub use quarry_ports::{Allocator, AllocatorError, AllocatorOptions, AllocatorResult, OfferSink};

use quarry_clock::VirtualClock;
use std::sync::Arc;

/// Factory function to create allocators by name
///
/// Unknown allocator or sorter names are an error; a benchmark must never
/// silently run against a different variant than the one it asked for.
pub fn create_allocator(
    name: &str,
    role_sorter: &str,
    framework_sorter: &str,
    clock: Arc<VirtualClock>,
) -> AllocatorResult<Box<dyn Allocator>> {
    let role_sorter = SorterKind::from_name(role_sorter)?;
    let framework_sorter = SorterKind::from_name(framework_sorter)?;

    match name.to_lowercase().as_str() {
        "hierarchicaldrf" | "hierarchical" => Ok(Box::new(HierarchicalAllocator::new(
            name,
            role_sorter,
            framework_sorter,
            clock,
        ))),
        _ => Err(AllocatorError::UnknownAllocator(name.to_string())),
    }
}
