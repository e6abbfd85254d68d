// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable text and
//! `StructuredLog` for emitting it through `tracing` with structured fields.
//!
//! # Organization
//!
//! * `engine` - thread pool lifecycle and scheduling events
//! * `pipeline` - assembly, task lifecycle and delivery events
//! * `processor` - built-in processor events
//! * `validation` - descriptor validation failures
//!
//! # Usage Pattern
//!
//! ```rust
//! use shardflow::observability::messages::pipeline::TaskStarted;
//!
//! let msg = TaskStarted {
//!     task: "reducer",
//!     processor: "shard_router",
//! };
//!
//! tracing::info!("{}", msg);
//! ```

use std::fmt::Display;
use tracing::Span;

pub mod engine;
pub mod pipeline;
pub mod processor;
pub mod validation;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog: Display {
    /// Emit the message at its documented level.
    fn log(&self);

    /// Build a span carrying the message fields.
    fn span(&self, name: &str) -> Span;
}
