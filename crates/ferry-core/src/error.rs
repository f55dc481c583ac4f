//! Error types module
//!
//! `QueueError` covers the preconditions of starting a queue. Rejected pushes
//! are not failures of the queue; `PushError` only tells the caller why its
//! item came back.

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue capacity must be a positive integer")]
    InvalidCapacity,

    #[error("No Tokio runtime available to spawn the queue worker")]
    NoRuntime,

    #[error("Invalid queue configuration: {0}")]
    Config(String),
}

/// Why `try_push` handed an item back.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PushError<T> {
    /// The current run's buffer has no free slot.
    #[error("queue is full")]
    Full(T),

    /// The queue was never started, or has been stopped.
    #[error("queue is not running")]
    NotRunning(T),
}

impl<T> PushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(item) | PushError::NotRunning(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, PushError::Full(_))
    }

    pub fn is_not_running(&self) -> bool {
        matches!(self, PushError::NotRunning(_))
    }
}
