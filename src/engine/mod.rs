//! Execution engine: the bounded thread pool, message delivery and pipeline lifecycle.

pub(crate) mod dispatcher;
pub mod pipeline;
pub mod thread_pool;

pub use pipeline::{Pipeline, PipelineState, PipelineSummary};
pub use thread_pool::{Job, PoolHandle, PoolStats, ThreadPool, TryScheduleError};
