//! Error types for the task scheduler core.

/// Top-level error type for the scheduler subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A submitted task failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Task store read or write failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The alarm sound file is missing or the player cannot start.
    #[error("sound unavailable: {0}")]
    SoundUnavailable(String),

    /// A firing-time side effect failed (process spawn, URL open, ...).
    #[error("action failed: {0}")]
    Action(String),

    /// Channel send/receive error, usually during shutdown.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SchedulerError>;
