use thiserror::Error;

/// MySQL error number for "Deadlock found when trying to get lock".
pub const MYSQL_DEADLOCK: u16 = 1213;

/// Outcome of a failed batch write.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Engine-level deadlock; the queue retries these with linear backoff.
    #[error("deadlock detected: {0}")]
    Deadlock(String),

    /// Anything else is terminal for the batch.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WriteError {
    pub fn is_deadlock(&self) -> bool {
        matches!(self, WriteError::Deadlock(_))
    }

    pub fn other(message: impl Into<String>) -> Self {
        WriteError::Other(anyhow::anyhow!(message.into()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("limiter acquire cancelled")]
    Cancelled,
    #[error("limiter closed")]
    Closed,
}
