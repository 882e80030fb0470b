//! Quarry Bench - Allocator benchmark harness
//!
//! Sets up a simulated cluster around an allocator-under-test so benchmark
//! logic can measure how it hands out resources:
//!
//! - **Config**: framework and agent profiles plus allocator arguments, built
//!   in code or loaded from JSON
//! - **Harness**: the simulation driver, registers every generated agent and
//!   framework on a virtual clock
//! - **Offers**: the default offer sink, a queue of flattened offers
//!
//! ## Architecture
//!
//! ```text
//!   BenchmarkConfig ──▶ AllocatorBenchmark ──add_slave/add_framework──▶ Allocator
//!                              │                                          │
//!                              │ pause/settle/resume                      │ offers
//!                              ▼                                          ▼
//!                        VirtualClock                               OfferQueue
//!                                                                         │
//!                                                                         ▼
//!                                                                  benchmark logic
//! ```

pub mod config;
pub mod error;
pub mod harness;
pub mod offers;

pub use config::{
    AgentProfile, BenchmarkConfig, BenchmarkConfigFile, ConfigError, FrameworkProfile,
    load_config, load_config_from_str, load_default_config,
};
pub use error::{BenchError, BenchResult};
pub use harness::{AllocatorBenchmark, AllocatorFactory, FrameworkProfiles};
pub use offers::{OfferQueue, OfferedResources};

/// Initialize `env_logger` from `RUST_LOG`; later calls are no-ops
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
