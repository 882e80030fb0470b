//! Quarry Core Domain
//!
//! Pure domain types shared by the allocator and the benchmark harness:
//! identifiers, agent/framework descriptors, the scalar `Resources` bag and
//! the platform constants the harness derives its thresholds from.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod constants;
pub mod entities;
pub mod values;

pub use entities::{
    AgentCapability, AgentId, AgentInfo, FrameworkCapability, FrameworkId, FrameworkInfo,
};
pub use values::{Quantity, Resources, ResourcesError, Timestamp};
