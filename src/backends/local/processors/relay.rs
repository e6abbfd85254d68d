// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::consts::DEFAULT_OUTPUT_PORT;
use crate::errors::PipelineError;
use crate::model::{Channel, Message, Task};
use crate::observability::messages::{processor::*, StructuredLog};
use crate::traits::Processor;

/// Relay mapper - forwards every message unchanged to its single output sink.
///
/// The output port is `output` unless the task sets the `port` param. With no sink wired
/// on that port, messages are released and logged at debug; that is not an error.
pub struct RelayProcessor {
    sink: Option<Arc<Channel>>,
}

impl RelayProcessor {
    pub fn new() -> Self {
        Self { sink: None }
    }
}

impl Default for RelayProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for RelayProcessor {
    fn start(&mut self, task: &Task) -> Result<(), PipelineError> {
        let port = task.param_str("port").unwrap_or(DEFAULT_OUTPUT_PORT);
        self.sink = task.sink(port)?;

        SinksResolved {
            task: task.name(),
            port,
            sinks: usize::from(self.sink.is_some()),
        }
        .log();
        Ok(())
    }

    fn receive(&mut self, channel: &Channel, message: Message) -> Result<(), PipelineError> {
        match &self.sink {
            Some(sink) => sink.send(message),
            None => {
                MessageDropped {
                    task: channel.consumer().task(),
                    channel: channel.id(),
                    size: message.size(),
                }
                .log();
                message.release();
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}
