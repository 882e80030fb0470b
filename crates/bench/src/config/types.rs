use quarry_core::Resources;
use quarry_core::constants::{DEFAULT_ALLOCATION_INTERVAL_MS, DEFAULT_ALLOCATOR, DEFAULT_SORTER};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::profiles::{AgentProfile, FrameworkProfile};

/// Root of a benchmark configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfigFile {
    #[serde(default = "default_allocator")]
    pub allocator: String,
    #[serde(default = "default_sorter")]
    pub role_sorter: String,
    #[serde(default = "default_sorter")]
    pub framework_sorter: String,
    #[serde(default = "default_allocation_interval_ms")]
    pub allocation_interval_ms: i64,
    #[serde(default = "default_true")]
    pub revocable_resources_allowed: bool,
    #[serde(default)]
    pub role_weights: HashMap<String, Decimal>,
    #[serde(default)]
    pub quotas: Option<HashMap<String, Resources>>,
    /// Resource names the framework sorter leaves out of fair shares
    #[serde(default)]
    pub fairness_excluded_resource_names: Option<BTreeSet<String>>,
    #[serde(default)]
    pub framework_profiles: Vec<FrameworkProfile>,
    #[serde(default)]
    pub agent_profiles: Vec<AgentProfile>,
}

fn default_allocator() -> String {
    DEFAULT_ALLOCATOR.to_string()
}

fn default_sorter() -> String {
    DEFAULT_SORTER.to_string()
}

fn default_allocation_interval_ms() -> i64 {
    DEFAULT_ALLOCATION_INTERVAL_MS
}

fn default_true() -> bool {
    true
}
