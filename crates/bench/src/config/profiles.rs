use quarry_core::{AgentId, FrameworkId, Resources};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Template for a group of identical frameworks
///
/// Fans out into `instances` frameworks named `<name>-<i>`, each subscribed
/// to `roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkProfile {
    pub name: String,
    pub roles: BTreeSet<String>,
    pub instances: usize,
    /// Tasks each instance launches over the whole benchmark
    pub max_tasks_per_instance: usize,
    /// Resources a single task needs
    pub task_resources: Resources,
    /// Upper bound on tasks launched from one offer
    #[serde(default = "default_max_tasks_per_offer")]
    pub max_tasks_per_offer: usize,
}

impl FrameworkProfile {
    pub fn new<I, S>(
        name: impl Into<String>,
        roles: I,
        instances: usize,
        max_tasks_per_instance: usize,
        task_resources: Resources,
        max_tasks_per_offer: usize,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            instances,
            max_tasks_per_instance,
            task_resources,
            max_tasks_per_offer,
        }
    }

    /// Tasks launched by all instances together
    pub fn total_tasks(&self) -> u64 {
        (self.instances as u64) * (self.max_tasks_per_instance as u64)
    }

    /// Id of the `index`-th framework built from this profile
    pub fn instance_id(&self, index: usize) -> FrameworkId {
        FrameworkId::new(format!("{}-{}", self.name, index))
    }
}

/// Template for a group of identical agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub instances: usize,
    /// Total resources of each agent
    pub resources: Resources,
    /// Resources already consumed on each agent, per owning framework
    #[serde(default)]
    pub used_resources: HashMap<FrameworkId, Resources>,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        instances: usize,
        resources: Resources,
        used_resources: HashMap<FrameworkId, Resources>,
    ) -> Self {
        Self {
            name: name.into(),
            instances,
            resources,
            used_resources,
        }
    }

    /// Id of the `index`-th agent built from this profile
    pub fn instance_id(&self, index: usize) -> AgentId {
        AgentId::new(format!("{}-{}", self.name, index))
    }
}

fn default_max_tasks_per_offer() -> usize {
    1
}
