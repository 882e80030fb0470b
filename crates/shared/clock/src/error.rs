use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("Clock must be paused to advance time")]
    NotPaused,

    #[error("Cannot advance time by a negative duration: {0}")]
    NegativeAdvance(chrono::Duration),

    #[error("Advancing by {0} moves past the latest representable time")]
    Overflow(chrono::Duration),
}

pub type ClockResult<T> = std::result::Result<T, ClockError>;
