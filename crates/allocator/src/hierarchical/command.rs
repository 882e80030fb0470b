use quarry_core::{AgentCapability, AgentId, AgentInfo, FrameworkId, FrameworkInfo, Resources};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::oneshot;

/// Commands that can be sent to the allocator event loop
#[derive(Debug)]
pub(crate) enum AllocatorCommand {
    AddSlave {
        agent_id: AgentId,
        agent_info: AgentInfo,
        capabilities: Vec<AgentCapability>,
        checkpointed_resources: Option<Resources>,
        total: Resources,
        used: HashMap<FrameworkId, Resources>,
    },

    AddFramework {
        framework_id: FrameworkId,
        framework_info: FrameworkInfo,
        used: HashMap<AgentId, Resources>,
        active: bool,
        suppressed_roles: BTreeSet<String>,
    },

    RecoverResources {
        framework_id: FrameworkId,
        agent_id: AgentId,
        resources: Resources,
    },

    Pause,

    Resume,

    /// Periodic allocation round, sent by the ticker
    Allocate,

    /// Read back the registered cluster
    Snapshot {
        response: oneshot::Sender<AllocatorSnapshot>,
    },
}

/// Registered agent as seen by the allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSnapshot {
    pub info: AgentInfo,
    pub capabilities: Vec<AgentCapability>,
    pub total: Resources,
    pub allocated: Resources,
}

/// Registered framework as seen by the allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkSnapshot {
    pub info: FrameworkInfo,
    pub active: bool,
    pub suppressed_roles: BTreeSet<String>,
}

/// Point-in-time view of the allocator's cluster state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocatorSnapshot {
    pub agents: BTreeMap<AgentId, AgentSnapshot>,
    pub frameworks: BTreeMap<FrameworkId, FrameworkSnapshot>,
    pub paused: bool,
}

/// Counters for an allocator instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub rounds_run: u64,
    pub rounds_skipped: u64,
    pub offers_made: u64,
}
