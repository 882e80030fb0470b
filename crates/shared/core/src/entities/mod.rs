mod agent;
mod framework;

pub use agent::{AgentCapability, AgentId, AgentInfo};
pub use framework::{FrameworkCapability, FrameworkId, FrameworkInfo};
