use thiserror::Error;

/// Errors raised by allocator construction and lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocatorError {
    #[error("Unknown allocator: {0}")]
    UnknownAllocator(String),

    #[error("Unknown sorter: {0}")]
    UnknownSorter(String),

    #[error("Allocator already initialized")]
    AlreadyInitialized,

    #[error("Allocator not initialized")]
    NotInitialized,

    #[error("Allocator event loop has shut down")]
    ShutDown,

    #[error("Allocation interval must be positive, got {0}ms")]
    InvalidInterval(i64),

    #[error("Allocator must be initialized inside a tokio runtime")]
    NoRuntime,
}

pub type AllocatorResult<T> = std::result::Result<T, AllocatorError>;
