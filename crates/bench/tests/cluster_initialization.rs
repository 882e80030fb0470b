//! Cluster initialization integration tests
//!
//! Most tests run the harness against a recording allocator to check what the
//! driver registers and in which order; the rest run the real hierarchical
//! allocator end to end on a paused virtual clock.

use chrono::Duration;
use quarry_bench::{
    AgentProfile, AllocatorBenchmark, AllocatorFactory, BenchError, BenchmarkConfig,
    FrameworkProfile, load_config_from_str,
};
use quarry_clock::{Clock, TimeControl, VirtualClock};
use quarry_core::{
    AgentCapability, AgentId, AgentInfo, FrameworkId, FrameworkInfo, Resources,
};
use quarry_ports::{
    Allocator, AllocatorError, AllocatorOptions, AllocatorResult, OfferMap, OfferSink,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

// ============================================================================
// Recording allocator
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Initialize {
        interval: Duration,
        revocable_resources_allowed: bool,
        min_allocatable_resources: Vec<Resources>,
    },
    AddSlave {
        agent_id: AgentId,
        hostname: String,
        total: Resources,
        used: HashMap<FrameworkId, Resources>,
    },
    AddFramework {
        framework_id: FrameworkId,
        roles: BTreeSet<String>,
        active: bool,
    },
    Pause {
        clock_paused: bool,
    },
    Resume {
        clock_paused: bool,
    },
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
    sink: Mutex<Option<Arc<dyn OfferSink>>>,
}

impl Recorder {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn sink(&self) -> Arc<dyn OfferSink> {
        self.sink.lock().unwrap().clone().unwrap()
    }
}

struct RecordingAllocator {
    clock: Arc<VirtualClock>,
    recorder: Arc<Recorder>,
}

impl Allocator for RecordingAllocator {
    fn name(&self) -> &str {
        "Recording"
    }

    fn initialize(
        &mut self,
        options: AllocatorOptions,
        offer_sink: Arc<dyn OfferSink>,
    ) -> AllocatorResult<()> {
        *self.recorder.sink.lock().unwrap() = Some(offer_sink);
        self.recorder.record(Call::Initialize {
            interval: options.allocation_interval,
            revocable_resources_allowed: options.revocable_resources_allowed,
            min_allocatable_resources: options.min_allocatable_resources,
        });
        Ok(())
    }

    fn add_slave(
        &self,
        agent_id: AgentId,
        agent_info: AgentInfo,
        _capabilities: Vec<AgentCapability>,
        _checkpointed_resources: Option<Resources>,
        total: Resources,
        used: HashMap<FrameworkId, Resources>,
    ) {
        self.recorder.record(Call::AddSlave {
            agent_id,
            hostname: agent_info.hostname,
            total,
            used,
        });
    }

    fn add_framework(
        &self,
        framework_id: FrameworkId,
        framework_info: FrameworkInfo,
        _used: HashMap<AgentId, Resources>,
        active: bool,
        _suppressed_roles: BTreeSet<String>,
    ) {
        self.recorder.record(Call::AddFramework {
            framework_id,
            roles: framework_info.roles,
            active,
        });
    }

    fn recover_resources(
        &self,
        _framework_id: FrameworkId,
        _agent_id: AgentId,
        _resources: Resources,
    ) {
    }

    fn pause(&self) {
        self.recorder.record(Call::Pause {
            clock_paused: self.clock.paused(),
        });
    }

    fn resume(&self) {
        self.recorder.record(Call::Resume {
            clock_paused: self.clock.paused(),
        });
    }
}

fn recording_factory(recorder: Arc<Recorder>) -> AllocatorFactory {
    Box::new(
        move |name: &str,
              _role_sorter: &str,
              _framework_sorter: &str,
              clock: Arc<VirtualClock>|
              -> AllocatorResult<Box<dyn Allocator>> {
            if name != "Recording" {
                return Err(AllocatorError::UnknownAllocator(name.to_string()));
            }
            Ok(Box::new(RecordingAllocator {
                clock,
                recorder: recorder.clone(),
            }))
        },
    )
}

// ============================================================================
// Helpers
// ============================================================================

fn res(text: &str) -> Resources {
    Resources::parse(text).unwrap()
}

fn fw_a() -> FrameworkProfile {
    FrameworkProfile::new("fwA", ["role1"], 1, 2, res("cpus:1;mem:512"), 2)
}

fn agent_a() -> AgentProfile {
    AgentProfile::new("agentA", 2, res("cpus:4;mem:4096"), HashMap::new())
}

/// agentA x2 (cpus:4;mem:4096) and fwA x1 (role1, 2 tasks of cpus:1;mem:512, 2 per offer)
fn scenario(allocator: &str) -> BenchmarkConfig {
    let mut config = BenchmarkConfig::new(allocator, "drf", "drf", Duration::seconds(1));
    config.add_agent_profile(agent_a()).add_framework_profile(fw_a());
    config
}

fn recording_harness(clock: &Arc<VirtualClock>) -> (AllocatorBenchmark, Arc<Recorder>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let recorder = Arc::new(Recorder::default());
    let harness = AllocatorBenchmark::with_factory(clock.clone(), recording_factory(recorder.clone()));
    (harness, recorder)
}

// ============================================================================
// Registration order and contents
// ============================================================================

#[tokio::test]
async fn test_scenario_registers_agents_then_frameworks() {
    let clock = VirtualClock::new(None);
    let (mut harness, recorder) = recording_harness(&clock);

    harness
        .initialize_cluster(&scenario("Recording"), None)
        .await
        .unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 6);
    assert!(matches!(
        &calls[0],
        Call::Initialize { interval, revocable_resources_allowed: true, .. }
            if *interval == Duration::seconds(1)
    ));
    assert_eq!(
        calls[1],
        Call::AddSlave {
            agent_id: AgentId::new("agentA-0"),
            hostname: "agentA-0".to_string(),
            total: res("cpus:4;mem:4096"),
            used: HashMap::new(),
        }
    );
    assert_eq!(
        calls[2],
        Call::AddSlave {
            agent_id: AgentId::new("agentA-1"),
            hostname: "agentA-1".to_string(),
            total: res("cpus:4;mem:4096"),
            used: HashMap::new(),
        }
    );
    // The allocator is paused while the clock is still held for setup
    assert_eq!(calls[3], Call::Pause { clock_paused: true });
    assert_eq!(
        calls[4],
        Call::AddFramework {
            framework_id: FrameworkId::new("fwA-0"),
            roles: BTreeSet::from(["role1".to_string()]),
            active: true,
        }
    );
    // ...and resumed only after the clock was restored
    assert_eq!(calls[5], Call::Resume { clock_paused: false });

    assert_eq!(harness.total_tasks_to_launch(), 2);
    assert_eq!(harness.framework_profile(&FrameworkId::new("fwA-0")).as_deref(), Some(&fw_a()));
    assert!(!clock.paused());
}

#[tokio::test]
async fn test_profiles_fan_out_with_unique_ids() {
    let clock = VirtualClock::new_paused(None);
    let (mut harness, recorder) = recording_harness(&clock);

    let mut config = BenchmarkConfig::new("Recording", "drf", "drf", Duration::seconds(1));
    config
        .add_agent_profile(agent_a())
        .add_agent_profile(AgentProfile::new("agentB", 3, res("cpus:8;mem:8192"), HashMap::new()))
        .add_framework_profile(fw_a())
        .add_framework_profile(FrameworkProfile::new(
            "fwB",
            ["role1", "role2"],
            3,
            5,
            res("cpus:2;mem:1024"),
            2,
        ));
    harness.initialize_cluster(&config, None).await.unwrap();

    let calls = recorder.calls();
    let agents: Vec<(AgentId, Resources)> = calls
        .iter()
        .filter_map(|call| match call {
            Call::AddSlave { agent_id, total, .. } => Some((agent_id.clone(), total.clone())),
            _ => None,
        })
        .collect();
    let agent_ids: BTreeSet<&str> = agents.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(agents.len(), 5);
    assert_eq!(agent_ids.len(), 5);
    assert!(agent_ids.contains("agentB-2"));
    assert!(
        agents
            .iter()
            .filter(|(id, _)| id.as_str().starts_with("agentB-"))
            .all(|(_, total)| *total == res("cpus:8;mem:8192"))
    );

    let frameworks: Vec<(FrameworkId, BTreeSet<String>)> = calls
        .iter()
        .filter_map(|call| match call {
            Call::AddFramework {
                framework_id,
                roles,
                ..
            } => Some((framework_id.clone(), roles.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(frameworks.len(), 4);
    assert_eq!(frameworks[3].0.as_str(), "fwB-2");
    assert_eq!(frameworks[3].1.len(), 2);

    assert_eq!(harness.total_tasks_to_launch(), 2 + 15);
    assert_eq!(harness.framework_profiles().len(), 4);
    assert_eq!(
        harness
            .framework_profile(&FrameworkId::new("fwB-1"))
            .map(|p| p.name.clone()),
        Some("fwB".to_string())
    );
    assert!(harness.framework_profile(&FrameworkId::new("fwB-3")).is_none());
}

#[tokio::test]
async fn test_used_resources_and_options_are_forwarded() {
    let clock = VirtualClock::new_paused(None);
    let (mut harness, recorder) = recording_harness(&clock);

    let used = HashMap::from([(FrameworkId::new("fwA-0"), res("cpus:1;mem:512"))]);
    let mut config = BenchmarkConfig::new("Recording", "drf", "drf", Duration::milliseconds(250));
    config.revocable_resources_allowed = false;
    config.add_agent_profile(AgentProfile::new("agentU", 1, res("cpus:4;mem:4096"), used.clone()));
    harness.initialize_cluster(&config, None).await.unwrap();

    let calls = recorder.calls();
    assert_eq!(
        calls[0],
        Call::Initialize {
            interval: Duration::milliseconds(250),
            revocable_resources_allowed: false,
            min_allocatable_resources: vec![res("cpus:0.01"), res("mem:32")],
        }
    );
    assert!(matches!(&calls[1], Call::AddSlave { used: forwarded, .. } if *forwarded == used));
    assert_eq!(harness.total_tasks_to_launch(), 0);
}

// ============================================================================
// Clock state
// ============================================================================

#[tokio::test]
async fn test_paused_clock_stays_paused() {
    let clock = VirtualClock::new_paused(None);
    let before = clock.now();
    let (mut harness, recorder) = recording_harness(&clock);

    harness
        .initialize_cluster(&scenario("Recording"), None)
        .await
        .unwrap();

    assert!(clock.paused());
    assert_eq!(clock.now(), before);
    assert_eq!(recorder.calls().last(), Some(&Call::Resume { clock_paused: true }));
}

#[tokio::test]
async fn test_failed_setup_restores_clock() {
    let running = VirtualClock::new(None);
    let mut harness = AllocatorBenchmark::new(running.clone());
    let err = harness
        .initialize_cluster(&scenario("Fifo"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BenchError::Allocator(AllocatorError::UnknownAllocator(name)) if name == "Fifo"
    ));
    assert!(!running.paused());
    assert!(harness.allocator().is_none());
    assert_eq!(harness.total_tasks_to_launch(), 0);

    let paused = VirtualClock::new_paused(None);
    let mut harness = AllocatorBenchmark::new(paused.clone());
    let mut config = scenario("HierarchicalDRF");
    config.role_sorter = "fair".to_string();
    let err = harness.initialize_cluster(&config, None).await.unwrap_err();
    assert!(matches!(
        err,
        BenchError::Allocator(AllocatorError::UnknownSorter(_))
    ));
    assert!(paused.paused());
    assert!(harness.framework_profiles().is_empty());
}

#[tokio::test]
async fn test_unschedulable_interval_fails_setup() {
    let mut config =
        load_config_from_str(r#"{"allocation_interval_ms": 9223372036854775807}"#).unwrap();
    config.add_agent_profile(agent_a());

    let running = VirtualClock::new(None);
    let mut harness = AllocatorBenchmark::new(running.clone());
    let err = harness.initialize_cluster(&config, None).await.unwrap_err();
    assert!(matches!(
        err,
        BenchError::Allocator(AllocatorError::InvalidInterval(ms)) if ms == i64::MAX
    ));
    assert!(!running.paused());
    assert!(harness.allocator().is_none());
    assert_eq!(running.pending_timers(), 0);
}

// ============================================================================
// Offer sinks
// ============================================================================

#[tokio::test]
async fn test_default_sink_flattens_into_offer_queue() {
    let clock = VirtualClock::new_paused(None);
    let (mut harness, recorder) = recording_harness(&clock);
    harness
        .initialize_cluster(&scenario("Recording"), None)
        .await
        .unwrap();

    let resources = res("cpus:4;mem:4096");
    let offers: OfferMap = HashMap::from([
        (
            "role1".to_string(),
            HashMap::from([
                (AgentId::new("agentA-0"), resources.clone()),
                (AgentId::new("agentA-1"), resources.clone()),
            ]),
        ),
        (
            "role2".to_string(),
            HashMap::from([(AgentId::new("agentA-0"), resources.clone())]),
        ),
    ]);
    recorder.sink().offer(&FrameworkId::new("fwA-0"), &offers);

    assert_eq!(harness.offers().len(), 3);
    let drained = harness.offers().drain();
    let pairs: BTreeSet<(String, String)> = drained
        .iter()
        .map(|o| (o.role.clone(), o.agent_id.as_str().to_string()))
        .collect();
    assert_eq!(pairs.len(), 3);
    assert!(pairs.contains(&("role2".to_string(), "agentA-0".to_string())));
    assert!(drained.iter().all(|o| o.framework_id.as_str() == "fwA-0"));
}

#[tokio::test]
async fn test_custom_sink_replaces_offer_queue() {
    let clock = VirtualClock::new_paused(None);
    let (mut harness, recorder) = recording_harness(&clock);

    let received = Arc::new(Mutex::new(Vec::new()));
    let target = received.clone();
    let sink: Arc<dyn OfferSink> = Arc::new(move |framework_id: &FrameworkId, _offers: &OfferMap| {
        target.lock().unwrap().push(framework_id.clone());
    });
    harness
        .initialize_cluster(&scenario("Recording"), Some(sink))
        .await
        .unwrap();

    recorder
        .sink()
        .offer(&FrameworkId::new("fwA-0"), &OfferMap::new());

    assert_eq!(*received.lock().unwrap(), vec![FrameworkId::new("fwA-0")]);
    assert!(harness.offers().is_empty());
}

// ============================================================================
// End to end with the hierarchical allocator
// ============================================================================

#[tokio::test]
async fn test_first_round_offers_every_agent() {
    let _ = env_logger::builder().is_test(true).try_init();

    let clock = VirtualClock::new_paused(None);
    let mut harness = AllocatorBenchmark::new(clock.clone());
    harness
        .initialize_cluster(&scenario("HierarchicalDRF"), None)
        .await
        .unwrap();

    // Frameworks were registered while the allocator was paused
    clock.settle().await;
    assert!(harness.offers().is_empty());

    clock.advance(Duration::seconds(1)).unwrap();
    clock.settle().await;

    let offers = harness.offers().drain();
    assert_eq!(offers.len(), 2);
    let agents: BTreeSet<&str> = offers.iter().map(|o| o.agent_id.as_str()).collect();
    assert_eq!(agents, BTreeSet::from(["agentA-0", "agentA-1"]));
    for offer in &offers {
        assert_eq!(offer.framework_id.as_str(), "fwA-0");
        assert_eq!(offer.role, "role1");
        assert_eq!(offer.resources, res("cpus:4;mem:4096"));
    }

    // Everything is allocated, so the next round offers nothing
    clock.advance(Duration::seconds(1)).unwrap();
    clock.settle().await;
    assert!(harness.offers().is_empty());
}

#[tokio::test]
async fn test_declined_offer_is_offered_again() {
    let clock = VirtualClock::new_paused(None);
    let mut harness = AllocatorBenchmark::new(clock.clone());
    harness
        .initialize_cluster(&scenario("HierarchicalDRF"), None)
        .await
        .unwrap();

    clock.advance(Duration::seconds(1)).unwrap();
    clock.settle().await;
    let first = harness.offers().drain();
    assert_eq!(first.len(), 2);

    let declined = &first[0];
    harness.allocator().unwrap().recover_resources(
        declined.framework_id.clone(),
        declined.agent_id.clone(),
        declined.resources.clone(),
    );
    clock.advance(Duration::seconds(1)).unwrap();
    clock.settle().await;

    let second = harness.offers().drain();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].agent_id, declined.agent_id);
    assert_eq!(second[0].resources, declined.resources);
}

#[tokio::test]
async fn test_running_clock_is_left_running() {
    let clock = VirtualClock::new(None);
    let mut harness = AllocatorBenchmark::new(clock.clone());
    harness
        .initialize_cluster(&scenario("HierarchicalDRF"), None)
        .await
        .unwrap();

    assert!(!clock.paused());
    assert_eq!(harness.total_tasks_to_launch(), 2);
    assert_eq!(
        harness.framework_profile(&FrameworkId::new("fwA-0")).as_deref(),
        Some(&fw_a())
    );
}
