use serde::{Deserialize, Serialize};

use crate::values::Resources;

/// Unique identifier for an agent (resource provider)
///
/// The harness passes generated names verbatim, so the id doubles as the
/// agent's hostname.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create a new agent ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Features an agent advertises to the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentCapability {
    MultiRole,
    HierarchicalRole,
    ReservationRefinement,
    ResourceProvider,
    ResizeVolume,
    AgentOperationFeedback,
    AgentDraining,
    TaskResourceLimits,
}

impl AgentCapability {
    /// The full capability set a current agent advertises
    pub fn all() -> Vec<AgentCapability> {
        vec![
            AgentCapability::MultiRole,
            AgentCapability::HierarchicalRole,
            AgentCapability::ReservationRefinement,
            AgentCapability::ResourceProvider,
            AgentCapability::ResizeVolume,
            AgentCapability::AgentOperationFeedback,
            AgentCapability::AgentDraining,
            AgentCapability::TaskResourceLimits,
        ]
    }
}

/// Agent descriptor handed to the allocator on registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: AgentId,
    pub hostname: String,
    pub resources: Resources,
}

impl AgentInfo {
    /// Describe an agent whose hostname is its id
    pub fn new(id: AgentId, resources: Resources) -> Self {
        Self {
            hostname: id.0.clone(),
            id,
            resources,
        }
    }
}
