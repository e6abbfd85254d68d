// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while assembling, starting, running and stopping a pipeline.
//!
//! Configuration errors (unknown processor, bad wiring, shard index out of range) are
//! fatal: assembly or `start` refuses to proceed, and a delivery-time configuration error
//! latches the pipeline into a failed state that `stop` reports.

use thiserror::Error;

use super::{PoolError, RegistryError, ValidationError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("pipeline descriptor is invalid: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),

    #[error("task '{task}': {source}")]
    Registry {
        task: String,
        #[source]
        source: RegistryError,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The consumer shard of an inbound channel is not an index into the resolved sinks
    #[error("task '{task}': channel '{channel}' carries consumer shard {shard} but only {sinks} output sinks are resolved")]
    ShardOutOfRange {
        task: String,
        channel: String,
        shard: usize,
        sinks: usize,
    },

    /// A port expected to hold a single sink has several channels bound
    #[error("task '{task}': port '{port}' has {count} channels bound, expected at most one")]
    AmbiguousSink {
        task: String,
        port: String,
        count: usize,
    },

    /// Sinks addressed by shard must cover 0..n without gaps
    #[error("task '{task}': port '{port}' has no channel for shard {shard}")]
    MissingSinkShard {
        task: String,
        port: String,
        shard: usize,
    },

    #[error("processor in task '{task}' failed: {reason}")]
    Processor { task: String, reason: String },

    #[error("processor in task '{task}' panicked: {reason}")]
    ProcessorPanicked { task: String, reason: String },

    #[error("no input channel named '{channel}'")]
    UnknownInput { channel: String },

    /// External input arrived after the pipeline stopped accepting it
    #[error("input channel '{channel}' is closed")]
    InputClosed { channel: String },

    #[error("channel '{channel}' is not attached to a running pipeline")]
    Detached { channel: String },

    /// A previous fatal error stopped the pipeline from accepting work
    #[error("pipeline aborted: {reason}")]
    Aborted { reason: String },

    #[error("cannot {operation} a pipeline that is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl PipelineError {
    /// Convenience constructor for processor implementations
    pub fn processor(task: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Processor {
            task: task.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by a malformed pipeline rather than a failing processor
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Invalid(_)
                | Self::Registry { .. }
                | Self::ShardOutOfRange { .. }
                | Self::AmbiguousSink { .. }
                | Self::MissingSinkShard { .. }
        )
    }
}
