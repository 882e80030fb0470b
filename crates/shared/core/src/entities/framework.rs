use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for a framework (resource consumer)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameworkId(pub String);

impl FrameworkId {
    /// Create a new framework ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FrameworkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FrameworkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Features a framework opts into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameworkCapability {
    MultiRole,
    RevocableResources,
    ReservationRefinement,
}

/// Framework descriptor handed to the allocator on registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub id: FrameworkId,
    pub name: String,
    pub user: String,
    /// Roles the framework subscribes to
    pub roles: BTreeSet<String>,
    pub capabilities: Vec<FrameworkCapability>,
}

impl FrameworkInfo {
    /// Default descriptor: named after its id, no roles, multi-role capable
    pub fn new(id: FrameworkId) -> Self {
        Self {
            name: id.0.clone(),
            id,
            user: String::new(),
            roles: BTreeSet::new(),
            capabilities: vec![
                FrameworkCapability::MultiRole,
                FrameworkCapability::ReservationRefinement,
            ],
        }
    }

    /// Replace the subscribed role set
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_capability(&self, capability: FrameworkCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}
