use chrono::Duration;
use quarry_ports::SorterOptions;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use super::BenchmarkConfig;
use super::types::BenchmarkConfigFile;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Allocation interval must be positive, got {0}ms")]
    InvalidInterval(i64),
    #[error("Profile '{0}' has no instances")]
    NoInstances(String),
    #[error("Duplicate {kind} profile name: {name}")]
    DuplicateProfile { kind: &'static str, name: String },
}

/// Load a benchmark configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BenchmarkConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load a benchmark configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<BenchmarkConfig, ConfigError> {
    let file: BenchmarkConfigFile = serde_json::from_str(json)?;
    file.validate()?;
    Ok(file.into_config())
}

/// Load the embedded default scenario
pub fn load_default_config() -> Result<BenchmarkConfig, ConfigError> {
    let default_config = include_str!("benchmark_config.json");
    load_config_from_str(default_config)
}

impl BenchmarkConfigFile {
    /// Validate the configuration
    ///
    /// Profile names must be unique per kind, since generated ids are
    /// `<profile>-<index>`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allocation_interval_ms <= 0 {
            return Err(ConfigError::InvalidInterval(self.allocation_interval_ms));
        }

        let mut seen = HashSet::new();
        for profile in &self.agent_profiles {
            if profile.instances == 0 {
                return Err(ConfigError::NoInstances(profile.name.clone()));
            }
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::DuplicateProfile {
                    kind: "agent",
                    name: profile.name.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for profile in &self.framework_profiles {
            if profile.instances == 0 {
                return Err(ConfigError::NoInstances(profile.name.clone()));
            }
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::DuplicateProfile {
                    kind: "framework",
                    name: profile.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Convert to the harness configuration
    pub fn into_config(self) -> BenchmarkConfig {
        let mut config = BenchmarkConfig::new(
            self.allocator,
            self.role_sorter,
            self.framework_sorter,
            Duration::milliseconds(self.allocation_interval_ms),
        );
        config.revocable_resources_allowed = self.revocable_resources_allowed;
        config.role_weights = self.role_weights;
        config.quotas = self.quotas;
        config.framework_sorter_options =
            self.fairness_excluded_resource_names
                .map(|names| SorterOptions {
                    fairness_excluded_resource_names: names,
                });

        for profile in self.agent_profiles {
            config.add_agent_profile(profile);
        }
        for profile in self.framework_profiles {
            config.add_framework_profile(profile);
        }
        config
    }
}
