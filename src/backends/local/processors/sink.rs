// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::PipelineError;
use crate::model::{Channel, Message};
use crate::traits::Processor;

/// Sink - releases every message it receives and produces no output
pub struct SinkProcessor;

impl SinkProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SinkProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for SinkProcessor {
    fn receive(&mut self, _channel: &Channel, message: Message) -> Result<(), PipelineError> {
        message.release();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sink"
    }
}
