use quarry_ports::AllocatorError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that abort benchmark setup
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Allocator error: {0}")]
    Allocator(#[from] AllocatorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cluster already initialized")]
    AlreadyInitialized,
}

pub type BenchResult<T> = Result<T, BenchError>;
