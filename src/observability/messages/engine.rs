// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for thread pool lifecycle and scheduling events.
//!
//! This module contains message types for logging events related to:
//! * Worker startup and exit
//! * Queue saturation (backpressure) and caller-runs fallbacks
//! * Faulting units of work
//! * Pool shutdown and termination

use crate::engine::PoolStats;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Thread pool workers are running.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shardflow::observability::messages::engine::PoolStarted;
///
/// let msg = PoolStarted {
///     workers: 4,
///     capacity: 10,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PoolStarted {
    pub workers: usize,
    pub capacity: usize,
}

impl Display for PoolStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Thread pool started: {} workers, queue capacity {}",
            self.workers, self.capacity
        )
    }
}

impl StructuredLog for PoolStarted {
    fn log(&self) {
        tracing::info!(
            workers = self.workers,
            capacity = self.capacity,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "thread_pool",
            span_name = name,
            workers = self.workers,
            capacity = self.capacity,
        )
    }
}

/// The queue was full and the caller is about to block.
///
/// # Log Level
/// `debug!` - Backpressure is expected behavior, not an error
pub struct QueueSaturated {
    pub capacity: usize,
}

impl Display for QueueSaturated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Work queue full ({} units), blocking caller until a worker frees space",
            self.capacity
        )
    }
}

impl StructuredLog for QueueSaturated {
    fn log(&self) {
        tracing::debug!(capacity = self.capacity, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("queue_saturated", span_name = name, capacity = self.capacity)
    }
}

/// A worker could not enqueue a delivery and runs it on its own thread.
///
/// # Log Level
/// `debug!` - Expected under load
pub struct CallerRuns<'a> {
    pub task: &'a str,
    pub reason: &'a str,
}

impl Display for CallerRuns<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Running delivery for task '{}' inline on the sending worker ({})",
            self.task, self.reason
        )
    }
}

impl StructuredLog for CallerRuns<'_> {
    fn log(&self) {
        tracing::debug!(task = self.task, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("caller_runs", span_name = name, task = self.task)
    }
}

/// A unit of work panicked; the worker keeps running.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use shardflow::observability::messages::engine::UnitPanicked;
///
/// let msg = UnitPanicked {
///     worker: "shardflow-worker-0",
///     reason: "index out of bounds",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct UnitPanicked<'a> {
    pub worker: &'a str,
    pub reason: &'a str,
}

impl Display for UnitPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unit of work panicked on {}: {}", self.worker, self.reason)
    }
}

impl StructuredLog for UnitPanicked<'_> {
    fn log(&self) {
        tracing::error!(worker = self.worker, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("unit_panicked", span_name = name, worker = self.worker)
    }
}

pub struct WorkerExited<'a> {
    pub worker: &'a str,
    pub executed: u64,
}

impl Display for WorkerExited<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker {} exited after executing {} units",
            self.worker, self.executed
        )
    }
}

impl StructuredLog for WorkerExited<'_> {
    fn log(&self) {
        tracing::debug!(worker = self.worker, executed = self.executed, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("worker_exited", span_name = name, worker = self.worker)
    }
}

/// Shutdown was requested; queued units still drain.
///
/// # Log Level
/// `debug!`
pub struct PoolShutdownRequested {
    pub queued: usize,
}

impl Display for PoolShutdownRequested {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Thread pool shutdown requested, draining {} queued units",
            self.queued
        )
    }
}

impl StructuredLog for PoolShutdownRequested {
    fn log(&self) {
        tracing::debug!(queued = self.queued, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("pool_shutdown", span_name = name, queued = self.queued)
    }
}

/// Every worker joined.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PoolTerminated<'a> {
    pub stats: &'a PoolStats,
}

impl Display for PoolTerminated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Thread pool terminated: {} scheduled, {} completed, {} panicked, peak queue depth {}/{}",
            self.stats.scheduled,
            self.stats.completed,
            self.stats.panicked,
            self.stats.peak_queued,
            self.stats.capacity
        )
    }
}

impl StructuredLog for PoolTerminated<'_> {
    fn log(&self) {
        tracing::info!(
            scheduled = self.stats.scheduled,
            completed = self.stats.completed,
            panicked = self.stats.panicked,
            peak_queued = self.stats.peak_queued,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pool_terminated",
            span_name = name,
            completed = self.stats.completed,
        )
    }
}
