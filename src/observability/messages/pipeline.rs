// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline assembly, task lifecycle and delivery events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Pipeline assembled from a descriptor.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shardflow::observability::messages::pipeline::PipelineAssembled;
///
/// let msg = PipelineAssembled {
///     tasks: 5,
///     channels: 7,
///     workers: 4,
///     capacity: 64,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineAssembled {
    pub tasks: usize,
    pub channels: usize,
    pub workers: usize,
    pub capacity: usize,
}

impl Display for PipelineAssembled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline assembled: {} tasks, {} channels, {} workers, queue capacity {}",
            self.tasks, self.channels, self.workers, self.capacity
        )
    }
}

impl StructuredLog for PipelineAssembled {
    fn log(&self) {
        tracing::info!(
            tasks = self.tasks,
            channels = self.channels,
            workers = self.workers,
            capacity = self.capacity,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            tasks = self.tasks,
            channels = self.channels,
        )
    }
}

/// A task's processor has been started.
///
/// # Log Level
/// `debug!`
pub struct TaskStarted<'a> {
    pub task: &'a str,
    pub processor: &'a str,
}

impl Display for TaskStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task '{}' started ({})", self.task, self.processor)
    }
}

impl StructuredLog for TaskStarted<'_> {
    fn log(&self) {
        tracing::debug!(task = self.task, processor = self.processor, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task",
            span_name = name,
            task = self.task,
            processor = self.processor,
        )
    }
}

pub struct TaskDone<'a> {
    pub task: &'a str,
}

impl Display for TaskDone<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task '{}' done", self.task)
    }
}

impl StructuredLog for TaskDone<'_> {
    fn log(&self) {
        tracing::debug!(task = self.task, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("task_done", span_name = name, task = self.task)
    }
}

/// Pipeline refused to start.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct PipelineStartFailed<'a> {
    pub task: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for PipelineStartFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline failed to start at task '{}': {}",
            self.task, self.error
        )
    }
}

impl StructuredLog for PipelineStartFailed<'_> {
    fn log(&self) {
        tracing::error!(task = self.task, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("pipeline_start_failed", span_name = name, task = self.task)
    }
}

/// A processor failed while handling a delivery; the pipeline aborts.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct DeliveryFailed<'a> {
    pub task: &'a str,
    pub channel: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for DeliveryFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Delivery on channel '{}' to task '{}' failed: {}",
            self.channel, self.task, self.error
        )
    }
}

impl StructuredLog for DeliveryFailed<'_> {
    fn log(&self) {
        tracing::error!(
            task = self.task,
            channel = self.channel,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "delivery_failed",
            span_name = name,
            task = self.task,
            channel = self.channel,
        )
    }
}

/// A pending delivery was released without reaching its processor.
///
/// # Log Level
/// `debug!` - Drops after an abort are expected
pub struct DeliveryDiscarded<'a> {
    pub task: &'a str,
    pub channel: &'a str,
}

impl Display for DeliveryDiscarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarding delivery on channel '{}' to task '{}': pipeline aborted",
            self.channel, self.task
        )
    }
}

impl StructuredLog for DeliveryDiscarded<'_> {
    fn log(&self) {
        tracing::debug!(task = self.task, channel = self.channel, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "delivery_discarded",
            span_name = name,
            task = self.task,
            channel = self.channel,
        )
    }
}

/// Pipeline stopped and its pool joined.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineStopped {
    pub delivered: u64,
    pub discarded: u64,
    pub duration: Duration,
}

impl Display for PipelineStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline stopped: {} messages delivered, {} discarded, ran for {:?}",
            self.delivered, self.discarded, self.duration
        )
    }
}

impl StructuredLog for PipelineStopped {
    fn log(&self) {
        tracing::info!(
            delivered = self.delivered,
            discarded = self.discarded,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_stopped",
            span_name = name,
            delivered = self.delivered,
            duration = ?self.duration,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_task_spans_carry_task_fields() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_test_writer()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let started = TaskStarted {
                task: "mapper.0",
                processor: "relay",
            }
            .span("start");
            let metadata = started.metadata().unwrap();
            assert_eq!(metadata.name(), "task");
            assert!(metadata.fields().field("processor").is_some());

            let done = TaskDone { task: "mapper.0" }.span("done");
            assert_eq!(done.metadata().map(|m| m.name()), Some("task_done"));
        });
    }
}
