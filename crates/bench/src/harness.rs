//! Simulation driver
//!
//! Builds a simulated cluster from a `BenchmarkConfig`: creates the allocator
//! by name, registers every agent and framework the profiles fan out into,
//! and leaves the virtual clock the way it found it.

use log::{debug, info};
use quarry_allocator::create_allocator;
use quarry_clock::{TimeControl, VirtualClock};
use quarry_core::{AgentCapability, AgentInfo, FrameworkId, FrameworkInfo};
use quarry_ports::{Allocator, AllocatorResult, OfferSink};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{BenchmarkConfig, FrameworkProfile};
use crate::error::{BenchError, BenchResult};
use crate::offers::OfferQueue;

/// Builds an allocator from (allocator, role sorter, framework sorter) names
pub type AllocatorFactory = Box<
    dyn Fn(&str, &str, &str, Arc<VirtualClock>) -> AllocatorResult<Box<dyn Allocator>>
        + Send
        + Sync,
>;

/// Framework id -> the profile it was generated from
pub type FrameworkProfiles = HashMap<FrameworkId, Arc<FrameworkProfile>>;

/// Harness owning the allocator-under-test and everything set up around it
///
/// Dropping the harness drops the allocator, which stops its timers.
pub struct AllocatorBenchmark {
    clock: Arc<VirtualClock>,
    factory: AllocatorFactory,
    allocator: Option<Box<dyn Allocator>>,
    offers: Arc<OfferQueue>,
    framework_profiles: Arc<FrameworkProfiles>,
    total_tasks_to_launch: u64,
}

impl AllocatorBenchmark {
    /// Harness resolving allocators through `quarry_allocator::create_allocator`
    pub fn new(clock: Arc<VirtualClock>) -> Self {
        Self::with_factory(clock, Box::new(create_allocator))
    }

    pub fn with_factory(clock: Arc<VirtualClock>, factory: AllocatorFactory) -> Self {
        Self {
            clock,
            factory,
            allocator: None,
            offers: Arc::new(OfferQueue::new()),
            framework_profiles: Arc::new(HashMap::new()),
            total_tasks_to_launch: 0,
        }
    }

    /// Set up the simulated cluster described by `config`
    ///
    /// Offers go to `offer_sink` if given, otherwise to `offers()`. On return
    /// the allocator is running and the clock is paused exactly if it was
    /// paused on entry, on success and on failure alike.
    pub async fn initialize_cluster(
        &mut self,
        config: &BenchmarkConfig,
        offer_sink: Option<Arc<dyn OfferSink>>,
    ) -> BenchResult<()> {
        if self.allocator.is_some() {
            return Err(BenchError::AlreadyInitialized);
        }

        let was_paused = self.clock.paused();
        if !was_paused {
            self.clock.pause();
        }

        let result = self.build_cluster(config, offer_sink).await;

        if !was_paused {
            self.clock.resume();
        }
        result?;

        if let Some(allocator) = &self.allocator {
            allocator.resume();
        }
        Ok(())
    }

    async fn build_cluster(
        &mut self,
        config: &BenchmarkConfig,
        offer_sink: Option<Arc<dyn OfferSink>>,
    ) -> BenchResult<()> {
        let offer_sink: Arc<dyn OfferSink> = match offer_sink {
            Some(sink) => sink,
            None => self.offers.clone(),
        };

        let mut allocator = (self.factory)(
            &config.allocator,
            &config.role_sorter,
            &config.framework_sorter,
            self.clock.clone(),
        )?;
        allocator.initialize(config.allocator_options(), offer_sink)?;

        let started = Instant::now();
        let mut agents = 0;
        for profile in &config.agent_profiles {
            for index in 0..profile.instances {
                let agent_id = profile.instance_id(index);
                debug!("Registering agent {}", agent_id);
                allocator.add_slave(
                    agent_id.clone(),
                    AgentInfo::new(agent_id, profile.resources.clone()),
                    AgentCapability::all(),
                    None,
                    profile.resources.clone(),
                    profile.used_resources.clone(),
                );
                agents += 1;
            }
        }
        self.clock.settle().await;
        info!("Added {} agents in {:?}", agents, started.elapsed());

        // Offers for the frameworks below come from periodic rounds only
        allocator.pause();

        let started = Instant::now();
        let mut profiles = FrameworkProfiles::new();
        let mut total_tasks = 0;
        for profile in &config.framework_profiles {
            let shared = Arc::new(profile.clone());
            for index in 0..profile.instances {
                let framework_id = profile.instance_id(index);
                debug!("Registering framework {}", framework_id);
                allocator.add_framework(
                    framework_id.clone(),
                    FrameworkInfo::new(framework_id.clone()).with_roles(profile.roles.iter().cloned()),
                    HashMap::new(),
                    true,
                    BTreeSet::new(),
                );
                profiles.insert(framework_id, shared.clone());
            }
            total_tasks += profile.total_tasks();
        }
        self.clock.settle().await;
        info!("Added {} frameworks in {:?}", profiles.len(), started.elapsed());

        self.framework_profiles = Arc::new(profiles);
        self.total_tasks_to_launch = total_tasks;
        self.allocator = Some(allocator);
        Ok(())
    }

    /// Profile the framework `framework_id` was generated from
    pub fn framework_profile(&self, framework_id: &FrameworkId) -> Option<Arc<FrameworkProfile>> {
        self.framework_profiles.get(framework_id).cloned()
    }

    pub fn framework_profiles(&self) -> Arc<FrameworkProfiles> {
        self.framework_profiles.clone()
    }

    /// Tasks all generated frameworks launch together
    pub fn total_tasks_to_launch(&self) -> u64 {
        self.total_tasks_to_launch
    }

    /// Offers received through the default sink
    pub fn offers(&self) -> &Arc<OfferQueue> {
        &self.offers
    }

    pub fn allocator(&self) -> Option<&dyn Allocator> {
        self.allocator.as_deref()
    }

    pub fn clock(&self) -> &Arc<VirtualClock> {
        &self.clock
    }
}
