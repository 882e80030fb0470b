//! Benchmark configuration
//!
//! `BenchmarkConfig` is built once before a run, either in code or from a
//! JSON file through `loader`, and then handed to the harness.

pub mod loader;
pub mod profiles;
pub mod types;

pub use loader::{ConfigError, load_config, load_config_from_str, load_default_config};
pub use profiles::{AgentProfile, FrameworkProfile};
pub use types::BenchmarkConfigFile;

use chrono::Duration;
use quarry_core::Resources;
use quarry_core::constants::{
    DEFAULT_ALLOCATION_INTERVAL_MS, DEFAULT_ALLOCATOR, DEFAULT_SORTER, MEGABYTE, MIN_CPUS,
    MIN_MEM_BYTES,
};
use quarry_ports::{AllocatorOptions, SorterOptions};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Everything needed to set up one simulated cluster
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    /// Allocator variant, resolved by name
    pub allocator: String,
    pub role_sorter: String,
    pub framework_sorter: String,
    /// Interval between periodic allocation rounds (virtual time)
    pub allocation_interval: Duration,
    /// Derived from the platform minimums, see `min_allocatable_resources`
    pub min_allocatable_resources: Vec<Resources>,
    pub framework_profiles: Vec<FrameworkProfile>,
    pub agent_profiles: Vec<AgentProfile>,
    pub revocable_resources_allowed: bool,
    pub role_weights: HashMap<String, Decimal>,
    pub quotas: Option<HashMap<String, Resources>>,
    pub framework_sorter_options: Option<SorterOptions>,
}

impl BenchmarkConfig {
    pub fn new(
        allocator: impl Into<String>,
        role_sorter: impl Into<String>,
        framework_sorter: impl Into<String>,
        allocation_interval: Duration,
    ) -> Self {
        Self {
            allocator: allocator.into(),
            role_sorter: role_sorter.into(),
            framework_sorter: framework_sorter.into(),
            allocation_interval,
            min_allocatable_resources: min_allocatable_resources(),
            framework_profiles: Vec::new(),
            agent_profiles: Vec::new(),
            revocable_resources_allowed: true,
            role_weights: HashMap::new(),
            quotas: None,
            framework_sorter_options: None,
        }
    }

    pub fn add_framework_profile(&mut self, profile: FrameworkProfile) -> &mut Self {
        self.framework_profiles.push(profile);
        self
    }

    pub fn add_agent_profile(&mut self, profile: AgentProfile) -> &mut Self {
        self.agent_profiles.push(profile);
        self
    }

    /// Tasks all framework profiles launch together
    pub fn total_tasks(&self) -> u64 {
        self.framework_profiles
            .iter()
            .map(FrameworkProfile::total_tasks)
            .sum()
    }

    /// Allocator initialization arguments for this configuration
    pub fn allocator_options(&self) -> AllocatorOptions {
        AllocatorOptions {
            allocation_interval: self.allocation_interval,
            weights: self.role_weights.clone(),
            quotas: self.quotas.clone(),
            revocable_resources_allowed: self.revocable_resources_allowed,
            framework_sorter_options: self.framework_sorter_options.clone(),
            min_allocatable_resources: self.min_allocatable_resources.clone(),
        }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOCATOR,
            DEFAULT_SORTER,
            DEFAULT_SORTER,
            Duration::milliseconds(DEFAULT_ALLOCATION_INTERVAL_MS),
        )
    }
}

/// Smallest offers worth making: `cpus:<MIN_CPUS>` or `mem:<MIN_MEM in MB>`
///
/// # Panics
/// If the platform constants do not format into parseable resources.
pub fn min_allocatable_resources() -> Vec<Resources> {
    let entries = [
        format!("cpus:{}", MIN_CPUS),
        format!("mem:{}", MIN_MEM_BYTES / MEGABYTE),
    ];

    entries
        .iter()
        .map(|text| {
            Resources::parse(text).unwrap_or_else(|e| {
                panic!("Invalid minimum allocatable resources '{}': {}", text, e)
            })
        })
        .collect()
}
