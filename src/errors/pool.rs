use thiserror::Error;

/// Thread pool errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("thread pool needs at least one worker")]
    NoWorkers,

    #[error("thread pool queue capacity must be at least 1")]
    ZeroCapacity,

    /// Work submitted after `shutdown`
    #[error("thread pool is shut down")]
    ShutDown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}
