// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the built-in processors.
//!
//! This module contains message types for logging events related to:
//! * Output sink resolution during `start`
//! * Messages dropped by processors with no sink wired
//! * Delivery records emitted by the diagnostic printer

use crate::backends::local::DeliveryRecord;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Output sinks resolved for a task port.
///
/// # Log Level
/// `debug!`
///
/// # Example
/// ```
/// use shardflow::observability::messages::processor::SinksResolved;
///
/// let msg = SinksResolved {
///     task: "reducer",
///     port: "output",
///     sinks: 3,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct SinksResolved<'a> {
    pub task: &'a str,
    pub port: &'a str,
    pub sinks: usize,
}

impl Display for SinksResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' resolved {} sinks on port '{}'",
            self.task, self.sinks, self.port
        )
    }
}

impl StructuredLog for SinksResolved<'_> {
    fn log(&self) {
        tracing::debug!(
            task = self.task,
            port = self.port,
            sinks = self.sinks,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "sinks_resolved",
            span_name = name,
            task = self.task,
            port = self.port,
        )
    }
}

/// A relay had no output sink and released the message.
///
/// # Log Level
/// `debug!` - Unconnected ports are a deliberate no-op path
pub struct MessageDropped<'a> {
    pub task: &'a str,
    pub channel: &'a str,
    pub size: usize,
}

impl Display for MessageDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' has no output sink; dropped {} byte message from channel '{}'",
            self.task, self.size, self.channel
        )
    }
}

impl StructuredLog for MessageDropped<'_> {
    fn log(&self) {
        tracing::debug!(
            task = self.task,
            channel = self.channel,
            size = self.size,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "message_dropped",
            span_name = name,
            task = self.task,
            channel = self.channel,
        )
    }
}

/// A delivery observed by the diagnostic printer.
///
/// # Log Level
/// `info!` - The record is the printer's output
///
/// # Example
/// ```
/// use shardflow::backends::local::DeliveryRecord;
/// use shardflow::observability::messages::processor::DeliveryRecorded;
///
/// let record = DeliveryRecord {
///     channel: "r1".to_string(),
///     producer: "reducer:output[1]".to_string(),
///     consumer: "printer.1:input[0]".to_string(),
///     key: "k1".to_string(),
///     value: "v1".to_string(),
/// };
/// let msg = DeliveryRecorded { record: &record };
///
/// tracing::info!("{}", msg);
/// ```
pub struct DeliveryRecorded<'a> {
    pub record: &'a DeliveryRecord,
}

impl Display for DeliveryRecorded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} -> {}: {}={}",
            self.record.channel,
            self.record.producer,
            self.record.consumer,
            self.record.key,
            self.record.value
        )
    }
}

impl StructuredLog for DeliveryRecorded<'_> {
    fn log(&self) {
        tracing::info!(
            channel = %self.record.channel,
            producer = %self.record.producer,
            consumer = %self.record.consumer,
            key = %self.record.key,
            value = %self.record.value,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "delivery",
            span_name = name,
            channel = %self.record.channel,
        )
    }
}

/// A delivery record rendered as one JSON line.
///
/// # Log Level
/// `info!`
pub struct DeliveryRecordedJson<'a> {
    pub line: &'a str,
}

impl Display for DeliveryRecordedJson<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.line)
    }
}

impl StructuredLog for DeliveryRecordedJson<'_> {
    fn log(&self) {
        tracing::info!(record = self.line, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("delivery_json", span_name = name)
    }
}
