//! Reference hierarchical allocator
//!
//! Two tasks are spawned on `initialize`:
//! - the event loop, which owns all cluster state and processes commands
//!   sequentially
//! - the ticker, which waits one allocation interval on the virtual clock
//!   and then enqueues an allocation round
//!
//! Every command carries a `WorkGuard`, so `VirtualClock::settle` returns
//! only after the event loop has processed everything sent before it.

mod command;
mod state;

pub use command::{AgentSnapshot, AllocatorSnapshot, AllocatorStats, FrameworkSnapshot};

use chrono::Duration;
use log::{debug, error, info};
use quarry_clock::{VirtualClock, WorkGuard};
use quarry_core::{AgentCapability, AgentId, AgentInfo, FrameworkId, FrameworkInfo, Resources};
use quarry_ports::{
    Allocator, AllocatorError, AllocatorOptions, AllocatorResult, Clock, OfferSink,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::sorter::SorterKind;
use command::AllocatorCommand;
use state::{AllocatorState, StatsCounters};

/// Handle to a hierarchical allocator instance
///
/// Dropping the handle aborts the event loop and the ticker.
pub struct HierarchicalAllocator {
    name: String,
    role_sorter: SorterKind,
    framework_sorter: SorterKind,
    clock: Arc<VirtualClock>,
    sender: Option<UnboundedSender<(AllocatorCommand, WorkGuard)>>,
    tasks: Vec<JoinHandle<()>>,
    stats: Arc<StatsCounters>,
}

impl HierarchicalAllocator {
    pub fn new(
        name: impl Into<String>,
        role_sorter: SorterKind,
        framework_sorter: SorterKind,
        clock: Arc<VirtualClock>,
    ) -> Self {
        Self {
            name: name.into(),
            role_sorter,
            framework_sorter,
            clock,
            sender: None,
            tasks: Vec::new(),
            stats: Arc::new(StatsCounters::default()),
        }
    }

    /// Send a command to the event loop
    fn dispatch(&self, command: AllocatorCommand) -> AllocatorResult<()> {
        let sender = self.sender.as_ref().ok_or(AllocatorError::NotInitialized)?;
        sender
            .send((command, self.clock.track()))
            .map_err(|_| AllocatorError::ShutDown)
    }

    fn dispatch_logged(&self, what: &str, command: AllocatorCommand) {
        if let Err(e) = self.dispatch(command) {
            error!("[{}] Dropping {}: {}", self.name, what, e);
        }
    }

    /// Read back the registered cluster (waits for queued commands first)
    pub async fn snapshot(&self) -> AllocatorResult<AllocatorSnapshot> {
        let (response, rx) = oneshot::channel();
        self.dispatch(AllocatorCommand::Snapshot { response })?;
        rx.await.map_err(|_| AllocatorError::ShutDown)
    }

    pub fn stats(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    fn spawn_ticker(
        &self,
        runtime: &tokio::runtime::Handle,
        sender: UnboundedSender<(AllocatorCommand, WorkGuard)>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let clock = self.clock.clone();
        // First deadline is fixed now, so an `advance` right after `initialize` reaches it
        let mut timer = clock.timer(interval);
        runtime.spawn(async move {
            loop {
                let guard = timer.wait().await;
                timer = clock.timer(interval);
                if sender.send((AllocatorCommand::Allocate, guard)).is_err() {
                    break;
                }
            }
        })
    }
}

impl Allocator for HierarchicalAllocator {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(
        &mut self,
        options: AllocatorOptions,
        offer_sink: Arc<dyn OfferSink>,
    ) -> AllocatorResult<()> {
        if self.sender.is_some() {
            return Err(AllocatorError::AlreadyInitialized);
        }
        // The first deadline must be representable on the clock
        if options.allocation_interval <= Duration::zero()
            || self
                .clock
                .now()
                .checked_add_signed(options.allocation_interval)
                .is_none()
        {
            return Err(AllocatorError::InvalidInterval(
                options.allocation_interval.num_milliseconds(),
            ));
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| AllocatorError::NoRuntime)?;

        info!(
            "[{}] Initializing (role sorter {:?}, framework sorter {:?}, revocable resources {}, {} weighted roles, {} quota roles)",
            self.name,
            self.role_sorter,
            self.framework_sorter,
            if options.revocable_resources_allowed {
                "allowed"
            } else {
                "disallowed"
            },
            options.weights.len(),
            options.quotas.as_ref().map_or(0, HashMap::len),
        );

        let interval = options.allocation_interval;
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = AllocatorState::new(
            options,
            offer_sink,
            self.role_sorter,
            self.framework_sorter,
            self.stats.clone(),
        );

        self.tasks.push(runtime.spawn(state.run(receiver)));
        self.tasks
            .push(self.spawn_ticker(&runtime, sender.clone(), interval));
        self.sender = Some(sender);
        Ok(())
    }

    fn add_slave(
        &self,
        agent_id: AgentId,
        agent_info: AgentInfo,
        capabilities: Vec<AgentCapability>,
        checkpointed_resources: Option<Resources>,
        total: Resources,
        used: HashMap<FrameworkId, Resources>,
    ) {
        self.dispatch_logged(
            "agent registration",
            AllocatorCommand::AddSlave {
                agent_id,
                agent_info,
                capabilities,
                checkpointed_resources,
                total,
                used,
            },
        );
    }

    fn add_framework(
        &self,
        framework_id: FrameworkId,
        framework_info: FrameworkInfo,
        used: HashMap<AgentId, Resources>,
        active: bool,
        suppressed_roles: BTreeSet<String>,
    ) {
        self.dispatch_logged(
            "framework registration",
            AllocatorCommand::AddFramework {
                framework_id,
                framework_info,
                used,
                active,
                suppressed_roles,
            },
        );
    }

    fn recover_resources(
        &self,
        framework_id: FrameworkId,
        agent_id: AgentId,
        resources: Resources,
    ) {
        self.dispatch_logged(
            "resource recovery",
            AllocatorCommand::RecoverResources {
                framework_id,
                agent_id,
                resources,
            },
        );
    }

    fn pause(&self) {
        self.dispatch_logged("pause", AllocatorCommand::Pause);
    }

    fn resume(&self) {
        self.dispatch_logged("resume", AllocatorCommand::Resume);
    }
}

impl Drop for HierarchicalAllocator {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if self.sender.take().is_some() {
            debug!("[{}] Allocator stopped", self.name);
        }
    }
}
