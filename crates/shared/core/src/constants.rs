//! Platform constants shared by the allocator and the benchmark harness

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Smallest cpu quantity worth offering
pub const MIN_CPUS: Decimal = dec!(0.01);

/// Smallest memory quantity worth offering, in bytes
pub const MIN_MEM_BYTES: u64 = 32 * MEGABYTE;

pub const MEGABYTE: u64 = 1024 * 1024;

/// Allocator variant used when a benchmark does not pick one
pub const DEFAULT_ALLOCATOR: &str = "HierarchicalDRF";

/// Sorter variant used when a benchmark does not pick one
pub const DEFAULT_SORTER: &str = "drf";

/// Interval between periodic allocation rounds
pub const DEFAULT_ALLOCATION_INTERVAL_MS: i64 = 1000;
