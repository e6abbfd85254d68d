// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline descriptor validation failures.

use crate::errors::ValidationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A descriptor failed validation.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use shardflow::errors::ValidationError;
/// use shardflow::observability::messages::validation::DescriptorRejected;
///
/// let error = ValidationError::DuplicateTask { task: "mapper".to_string() };
/// let msg = DescriptorRejected {
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct DescriptorRejected<'a> {
    pub error: &'a ValidationError,
}

impl Display for DescriptorRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pipeline descriptor rejected: {}", self.error)
    }
}

impl StructuredLog for DescriptorRejected<'_> {
    fn log(&self) {
        tracing::error!(error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("descriptor_rejected", span_name = name)
    }
}
