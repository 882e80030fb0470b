//! Sets up the cluster from a benchmark config file (or the embedded
//! default) and reports what the first allocation round offers.

use log::info;
use quarry_bench::{AllocatorBenchmark, load_config, load_default_config};
use quarry_clock::{TimeControl, VirtualClock};
use std::collections::BTreeSet;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    quarry_bench::init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(path)?,
        None => load_default_config()?,
    };

    let clock = VirtualClock::new_paused(None);
    let mut harness = AllocatorBenchmark::new(clock.clone());
    harness.initialize_cluster(&config, None).await?;

    clock.advance(config.allocation_interval)?;
    clock.settle().await;

    let offers = harness.offers().drain();
    let frameworks: BTreeSet<_> = offers.iter().map(|o| &o.framework_id).collect();
    info!(
        "First allocation round: {} offers to {} of {} frameworks, {} tasks to launch",
        offers.len(),
        frameworks.len(),
        harness.framework_profiles().len(),
        harness.total_tasks_to_launch()
    );

    Ok(())
}
