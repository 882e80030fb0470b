use chrono::Duration;
use quarry_core::{AgentCapability, AgentId, AgentInfo, FrameworkId, FrameworkInfo, Resources};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::AllocatorResult;

/// One allocation round's offers for a single framework: role -> agent -> resources
pub type OfferMap = HashMap<String, HashMap<AgentId, Resources>>;

/// Port receiving the offers an allocator produces
///
/// Invoked from the allocator's own execution context, so implementations
/// must be cheap and must not block.
pub trait OfferSink: Send + Sync {
    fn offer(&self, framework_id: &FrameworkId, offers: &OfferMap);
}

impl<F> OfferSink for F
where
    F: Fn(&FrameworkId, &OfferMap) + Send + Sync,
{
    fn offer(&self, framework_id: &FrameworkId, offers: &OfferMap) {
        self(framework_id, offers)
    }
}

/// Extra knobs for the framework sorter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SorterOptions {
    /// Resource names ignored when computing fair shares
    pub fairness_excluded_resource_names: BTreeSet<String>,
}

/// Arguments for `Allocator::initialize`
#[derive(Debug, Clone)]
pub struct AllocatorOptions {
    /// Interval between periodic allocation rounds (virtual time)
    pub allocation_interval: Duration,
    /// Initial role weights; roles not listed weigh 1
    pub weights: HashMap<String, Decimal>,
    /// Per-role quota guarantees, if any
    pub quotas: Option<HashMap<String, Resources>>,
    /// Whether revocable resources may be offered
    pub revocable_resources_allowed: bool,
    pub framework_sorter_options: Option<SorterOptions>,
    /// An agent's leftovers are offered only if they contain one of these
    pub min_allocatable_resources: Vec<Resources>,
}

/// Port for the allocator-under-test
///
/// Registration calls are fire-and-forget: they enqueue work on the
/// allocator's event loop and return immediately. Callers use the virtual
/// clock's `settle` to wait for them to be processed.
pub trait Allocator: Send + Sync {
    /// Get the name of the allocator variant
    fn name(&self) -> &str;

    /// Start the allocator; offers are delivered to `offer_sink`
    fn initialize(
        &mut self,
        options: AllocatorOptions,
        offer_sink: Arc<dyn OfferSink>,
    ) -> AllocatorResult<()>;

    /// Register an agent with its total and already-used resources
    fn add_slave(
        &self,
        agent_id: AgentId,
        agent_info: AgentInfo,
        capabilities: Vec<AgentCapability>,
        checkpointed_resources: Option<Resources>,
        total: Resources,
        used: HashMap<FrameworkId, Resources>,
    );

    /// Register a framework with the resources it already holds per agent
    fn add_framework(
        &self,
        framework_id: FrameworkId,
        framework_info: FrameworkInfo,
        used: HashMap<AgentId, Resources>,
        active: bool,
        suppressed_roles: BTreeSet<String>,
    );

    /// Return resources previously offered to a framework
    fn recover_resources(
        &self,
        framework_id: FrameworkId,
        agent_id: AgentId,
        resources: Resources,
    );

    /// Stop allocating until `resume`
    fn pause(&self);

    fn resume(&self);
}
