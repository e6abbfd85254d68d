// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during pipeline descriptor validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Two task instances resolve to the same name
    #[error("Duplicate task name: '{task}'")]
    DuplicateTask { task: String },

    /// Two channels share an id
    #[error("Duplicate channel id: '{channel}'")]
    DuplicateChannel { channel: String },

    /// A task declares zero shards
    #[error("Task '{task}' declares 0 shards; at least 1 is required")]
    InvalidShardCount { task: String },

    /// A task has no processor name bound
    #[error("Task '{task}' has no processor name")]
    MissingProcessor { task: String },

    /// A channel endpoint names a task instance that doesn't exist
    #[error("Channel '{channel}' references task '{task}' which does not exist")]
    UnresolvedTask { channel: String, task: String },

    /// Two channels are bound to the same task/port/shard slot
    #[error("Channels '{first}' and '{second}' are both bound to {direction} slot {slot}")]
    PortConflict {
        direction: &'static str,
        slot: String,
        first: String,
        second: String,
    },

    /// Executor sizing is unusable
    #[error("Executor option '{option}' must be at least 1")]
    InvalidExecutorOption { option: &'static str },

    /// A circular path was detected in the channel graph
    #[error("Cyclic channel graph detected: {}", .cycle.join(" -> "))]
    CyclicGraph {
        /// The cycle path, first task repeated at the end
        cycle: Vec<String>,
    },
}

/// Errors raised while loading a pipeline descriptor from disk
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read pipeline descriptor '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML pipeline descriptor: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML pipeline descriptor: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Pipeline descriptor validation failed:\n{}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
