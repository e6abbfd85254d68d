// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout shardflow. Message types follow a struct-based pattern with a
//! `Display` implementation and a `StructuredLog` implementation so that:
//!
//! * Log wording lives in one place instead of being scattered through the engine
//! * Every event carries the same structured fields wherever it is emitted
//! * Log levels are decided by the message type, not by the call site
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - thread pool lifecycle and scheduling events
//! * `messages::pipeline` - pipeline assembly, task lifecycle and delivery events
//! * `messages::processor` - events emitted by the built-in processors
//! * `messages::validation` - descriptor validation failures
//!
//! # Usage
//!
//! ```rust
//! use shardflow::observability::messages::{engine::PoolStarted, StructuredLog};
//!
//! PoolStarted {
//!     workers: 4,
//!     capacity: 64,
//! }
//! .log();
//! ```

pub mod messages;
