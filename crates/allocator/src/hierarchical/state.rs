use log::{debug, info, trace};
use quarry_clock::WorkGuard;
use quarry_core::{AgentCapability, AgentId, AgentInfo, FrameworkId, FrameworkInfo, Resources};
use quarry_ports::{AllocatorOptions, OfferMap, OfferSink};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;

use super::command::{
    AgentSnapshot, AllocatorCommand, AllocatorSnapshot, AllocatorStats, FrameworkSnapshot,
};
use crate::sorter::{Sorter, SorterKind};

/// Role used for resources an agent reports as used before any framework registered
const UNATTRIBUTED_ROLE: &str = "*";

/// Counters shared between the event loop and the allocator handle
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    rounds_run: AtomicU64,
    rounds_skipped: AtomicU64,
    offers_made: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            rounds_run: self.rounds_run.load(Ordering::Relaxed),
            rounds_skipped: self.rounds_skipped.load(Ordering::Relaxed),
            offers_made: self.offers_made.load(Ordering::Relaxed),
        }
    }
}

struct AgentState {
    info: AgentInfo,
    capabilities: Vec<AgentCapability>,
    total: Resources,
    allocated: Resources,
}

impl AgentState {
    fn available(&self) -> Resources {
        self.total.clone() - &self.allocated
    }
}

struct FrameworkState {
    info: FrameworkInfo,
    active: bool,
    suppressed_roles: BTreeSet<String>,
}

/// State owned by the allocator event loop
///
/// Only the event loop task touches this, so no locking is needed; the
/// handle talks to it through `AllocatorCommand`s.
pub(crate) struct AllocatorState {
    options: AllocatorOptions,
    offer_sink: Arc<dyn OfferSink>,
    framework_sorter_kind: SorterKind,
    agents: BTreeMap<AgentId, AgentState>,
    frameworks: BTreeMap<FrameworkId, FrameworkState>,
    role_sorter: Box<dyn Sorter>,
    /// role -> sorter over the frameworks subscribed to it
    framework_sorters: HashMap<String, Box<dyn Sorter>>,
    /// (framework, agent) -> role -> resources held
    allocations: BTreeMap<(FrameworkId, AgentId), BTreeMap<String, Resources>>,
    paused: bool,
    stats: Arc<StatsCounters>,
}

impl AllocatorState {
    pub(crate) fn new(
        options: AllocatorOptions,
        offer_sink: Arc<dyn OfferSink>,
        role_sorter_kind: SorterKind,
        framework_sorter_kind: SorterKind,
        stats: Arc<StatsCounters>,
    ) -> Self {
        let mut role_sorter = role_sorter_kind.build(None);
        for (role, weight) in &options.weights {
            role_sorter.set_weight(role, *weight);
        }

        Self {
            options,
            offer_sink,
            framework_sorter_kind,
            agents: BTreeMap::new(),
            frameworks: BTreeMap::new(),
            role_sorter,
            framework_sorters: HashMap::new(),
            allocations: BTreeMap::new(),
            paused: false,
            stats,
        }
    }

    /// Main event loop - processes commands sequentially
    pub(crate) async fn run(mut self, mut rx: UnboundedReceiver<(AllocatorCommand, WorkGuard)>) {
        info!(
            "Allocator event loop started (interval {}ms, {} min allocatable entries)",
            self.options.allocation_interval.num_milliseconds(),
            self.options.min_allocatable_resources.len()
        );

        while let Some((command, _guard)) = rx.recv().await {
            self.handle(command);
        }

        info!("Allocator event loop stopped");
    }

    fn handle(&mut self, command: AllocatorCommand) {
        match command {
            AllocatorCommand::AddSlave {
                agent_id,
                agent_info,
                capabilities,
                checkpointed_resources,
                total,
                used,
            } => {
                if let Some(checkpointed) = checkpointed_resources {
                    trace!("Agent {} checkpointed {}", agent_id, checkpointed);
                }
                self.add_slave(agent_id.clone(), agent_info, capabilities, total, used);
                self.allocate(Some(std::slice::from_ref(&agent_id)));
            }
            AllocatorCommand::AddFramework {
                framework_id,
                framework_info,
                used,
                active,
                suppressed_roles,
            } => {
                self.add_framework(framework_id, framework_info, used, active, suppressed_roles);
                self.allocate(None);
            }
            AllocatorCommand::RecoverResources {
                framework_id,
                agent_id,
                resources,
            } => self.recover_resources(&framework_id, &agent_id, resources),
            AllocatorCommand::Pause => {
                debug!("Allocator paused");
                self.paused = true;
            }
            AllocatorCommand::Resume => {
                debug!("Allocator resumed");
                self.paused = false;
            }
            AllocatorCommand::Allocate => self.allocate(None),
            AllocatorCommand::Snapshot { response } => {
                let _ = response.send(self.snapshot());
            }
        }
    }

    fn add_slave(
        &mut self,
        agent_id: AgentId,
        agent_info: AgentInfo,
        capabilities: Vec<AgentCapability>,
        total: Resources,
        used: HashMap<FrameworkId, Resources>,
    ) {
        let mut allocated = Resources::new();
        for (framework_id, resources) in used {
            allocated += &resources;
            *self
                .allocations
                .entry((framework_id, agent_id.clone()))
                .or_default()
                .entry(UNATTRIBUTED_ROLE.to_string())
                .or_default() += &resources;
        }

        self.role_sorter.add_total(&total);
        for sorter in self.framework_sorters.values_mut() {
            sorter.add_total(&total);
        }

        debug!(
            "Added agent {} with {} (allocated: {})",
            agent_id, total, allocated
        );

        self.agents.insert(
            agent_id,
            AgentState {
                info: agent_info,
                capabilities,
                total,
                allocated,
            },
        );
    }

    fn add_framework(
        &mut self,
        framework_id: FrameworkId,
        framework_info: FrameworkInfo,
        used: HashMap<AgentId, Resources>,
        active: bool,
        suppressed_roles: BTreeSet<String>,
    ) {
        let cluster_total: Resources = self.agents.values().map(|a| &a.total).sum();

        for role in &framework_info.roles {
            self.role_sorter.add(role);
            let kind = self.framework_sorter_kind;
            let options = self.options.framework_sorter_options.as_ref();
            let sorter = self.framework_sorters.entry(role.clone()).or_insert_with(|| {
                let mut sorter = kind.build(options);
                sorter.add_total(&cluster_total);
                sorter
            });
            sorter.add(framework_id.as_str());
        }

        // Resources held on registration count against the first role
        if let Some(role) = framework_info.roles.iter().next().cloned() {
            for (agent_id, resources) in used {
                if let Some(agent) = self.agents.get_mut(&agent_id) {
                    agent.allocated += &resources;
                }
                self.track_allocation(&framework_id, &agent_id, &role, &resources);
            }
        }

        debug!(
            "Added framework {} with roles {:?} (active: {})",
            framework_id, framework_info.roles, active
        );

        self.frameworks.insert(
            framework_id,
            FrameworkState {
                info: framework_info,
                active,
                suppressed_roles,
            },
        );
    }

    fn recover_resources(
        &mut self,
        framework_id: &FrameworkId,
        agent_id: &AgentId,
        resources: Resources,
    ) {
        let key = (framework_id.clone(), agent_id.clone());
        let Some(by_role) = self.allocations.get_mut(&key) else {
            debug!(
                "Ignoring recovery of {} from unknown allocation {} on {}",
                resources, framework_id, agent_id
            );
            return;
        };

        let mut remaining = resources;
        let mut recovered = Resources::new();
        for (role, held) in by_role.iter_mut() {
            if remaining.is_empty() {
                break;
            }
            // The part of `held` covered by what is left to recover
            let taken = held.clone() - &(held.clone() - &remaining);
            if taken.is_empty() {
                continue;
            }
            *held -= &taken;
            remaining -= &taken;
            recovered += &taken;

            self.role_sorter.unallocated(role, &taken);
            if let Some(sorter) = self.framework_sorters.get_mut(role) {
                sorter.unallocated(framework_id.as_str(), &taken);
            }
        }
        by_role.retain(|_, held| !held.is_empty());
        if by_role.is_empty() {
            self.allocations.remove(&key);
        }

        if let Some(agent) = self.agents.get_mut(agent_id) {
            agent.allocated -= &recovered;
        }

        debug!(
            "Recovered {} from framework {} on agent {}",
            recovered, framework_id, agent_id
        );
    }

    fn track_allocation(
        &mut self,
        framework_id: &FrameworkId,
        agent_id: &AgentId,
        role: &str,
        resources: &Resources,
    ) {
        *self
            .allocations
            .entry((framework_id.clone(), agent_id.clone()))
            .or_default()
            .entry(role.to_string())
            .or_default() += resources;

        self.role_sorter.allocated(role, resources);
        if let Some(sorter) = self.framework_sorters.get_mut(role) {
            sorter.allocated(framework_id.as_str(), resources);
        }
    }

    /// Whether leftovers are worth offering
    fn allocatable(&self, available: &Resources) -> bool {
        if available.is_empty() {
            return false;
        }
        let minimums = &self.options.min_allocatable_resources;
        minimums.is_empty() || minimums.iter().any(|min| available.contains(min))
    }

    /// Roles in the order they are offered: roles with quota first, then the role sorter's order
    fn role_order(&mut self) -> Vec<String> {
        let sorted = self.role_sorter.sort();
        match &self.options.quotas {
            Some(quotas) => {
                let (mut guaranteed, rest): (Vec<String>, Vec<String>) =
                    sorted.into_iter().partition(|role| quotas.contains_key(role));
                guaranteed.extend(rest);
                guaranteed
            }
            None => sorted,
        }
    }

    /// Run one allocation round, over `agents` or the whole cluster
    fn allocate(&mut self, agents: Option<&[AgentId]>) {
        if self.paused {
            self.stats.rounds_skipped.fetch_add(1, Ordering::Relaxed);
            debug!("Skipped allocation because the allocator is paused");
            return;
        }

        let agent_ids: Vec<AgentId> = match agents {
            Some(ids) => ids.to_vec(),
            None => self.agents.keys().cloned().collect(),
        };
        let roles = self.role_order();

        let mut offerable: BTreeMap<FrameworkId, OfferMap> = BTreeMap::new();

        for agent_id in &agent_ids {
            'roles: for role in &roles {
                let Some(sorter) = self.framework_sorters.get_mut(role) else {
                    continue;
                };

                for client in sorter.sort() {
                    let framework_id = FrameworkId::new(client);
                    let Some(framework) = self.frameworks.get(&framework_id) else {
                        continue;
                    };
                    if !framework.active || framework.suppressed_roles.contains(role) {
                        continue;
                    }

                    let Some(agent) = self.agents.get(agent_id) else {
                        break 'roles;
                    };
                    let available = agent.available();
                    if !self.allocatable(&available) {
                        break 'roles;
                    }

                    if let Some(agent) = self.agents.get_mut(agent_id) {
                        agent.allocated += &available;
                    }
                    self.track_allocation(&framework_id, agent_id, role, &available);

                    trace!(
                        "Allocating {} on agent {} to role {} of framework {}",
                        available, agent_id, role, framework_id
                    );

                    offerable
                        .entry(framework_id)
                        .or_default()
                        .entry(role.clone())
                        .or_default()
                        .insert(agent_id.clone(), available);
                }
            }
        }

        self.stats.rounds_run.fetch_add(1, Ordering::Relaxed);

        for (framework_id, offers) in offerable {
            let count: usize = offers.values().map(HashMap::len).sum();
            self.stats
                .offers_made
                .fetch_add(count as u64, Ordering::Relaxed);
            self.offer_sink.offer(&framework_id, &offers);
        }
    }

    fn snapshot(&self) -> AllocatorSnapshot {
        AllocatorSnapshot {
            agents: self
                .agents
                .iter()
                .map(|(id, a)| {
                    (
                        id.clone(),
                        AgentSnapshot {
                            info: a.info.clone(),
                            capabilities: a.capabilities.clone(),
                            total: a.total.clone(),
                            allocated: a.allocated.clone(),
                        },
                    )
                })
                .collect(),
            frameworks: self
                .frameworks
                .iter()
                .map(|(id, f)| {
                    (
                        id.clone(),
                        FrameworkSnapshot {
                            info: f.info.clone(),
                            active: f.active,
                            suppressed_roles: f.suppressed_roles.clone(),
                        },
                    )
                })
                .collect(),
            paused: self.paused,
        }
    }
}
