use std::sync::Arc;

use crate::config::consts::DEFAULT_OUTPUT_PORT;
use crate::errors::PipelineError;
use crate::model::{Channel, Message, Task};
use crate::observability::messages::{processor::*, StructuredLog};
use crate::traits::Processor;

/// Shard-routing reducer.
///
/// Output sinks are indexed by their producer shard (`0..n`, no gaps). Each inbound
/// message is forwarded to the sink whose index equals the *consumer* shard of the
/// channel it arrived on.
///
/// A consumer shard that is not an index into the sinks is a topology bug: `start` refuses
/// to run when any inbound channel is out of range, and `receive` fails the same way.
pub struct ShardRouterProcessor {
    sinks: Vec<Arc<Channel>>,
}

impl ShardRouterProcessor {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    fn out_of_range(&self, channel: &Channel) -> PipelineError {
        PipelineError::ShardOutOfRange {
            task: channel.consumer().task().to_string(),
            channel: channel.id().to_string(),
            shard: channel.consumer().shard(),
            sinks: self.sinks.len(),
        }
    }
}

impl Default for ShardRouterProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for ShardRouterProcessor {
    fn start(&mut self, task: &Task) -> Result<(), PipelineError> {
        let port = task.param_str("port").unwrap_or(DEFAULT_OUTPUT_PORT);
        self.sinks = task.sinks_by_shard(port)?;

        if let Some(source) = task
            .sources()
            .iter()
            .find(|source| source.consumer().shard() >= self.sinks.len())
        {
            return Err(self.out_of_range(source));
        }

        SinksResolved {
            task: task.name(),
            port,
            sinks: self.sinks.len(),
        }
        .log();
        Ok(())
    }

    fn receive(&mut self, channel: &Channel, message: Message) -> Result<(), PipelineError> {
        match self.sinks.get(channel.consumer().shard()) {
            Some(sink) => sink.send(message),
            None => Err(self.out_of_range(channel)),
        }
    }

    fn name(&self) -> &'static str {
        "shard_router"
    }
}
