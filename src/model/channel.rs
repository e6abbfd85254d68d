// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ports and channels.
//!
//! A channel is an ordered single-producer/single-consumer conduit. Sending a message
//! hands ownership to the pipeline's dispatcher, which delivers it to the consumer
//! task's `Processor::receive` in send order.

use std::fmt;
use std::sync::{Arc, Weak};

use serde::Serialize;

use crate::engine::dispatcher::Dispatcher;
use crate::errors::PipelineError;
use crate::model::{Message, Task};

/// A task endpoint: task instance, port name and shard slot.
///
/// The shard of a consumer port is the routing key read by shard-aware processors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Port {
    task: String,
    name: String,
    shard: usize,
}

impl Port {
    pub fn new(task: impl Into<String>, name: impl Into<String>, shard: usize) -> Self {
        Self {
            task: task.into(),
            name: name.into(),
            shard,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shard(&self) -> usize {
        self.shard
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}[{}]", self.task, self.name, self.shard)
    }
}

enum Route {
    /// Not bound to a pipeline; sends fail
    Detached,
    Attached {
        consumer: Weak<Task>,
        dispatcher: Arc<Dispatcher>,
    },
}

pub struct Channel {
    id: String,
    /// `None` for input channels fed from outside the pipeline
    producer: Option<Port>,
    consumer: Port,
    route: Route,
}

impl Channel {
    /// A channel not bound to any pipeline. Useful for driving a processor directly.
    pub fn detached(id: impl Into<String>, producer: Option<Port>, consumer: Port) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            producer,
            consumer,
            route: Route::Detached,
        })
    }

    pub(crate) fn attached(
        id: impl Into<String>,
        producer: Option<Port>,
        consumer: Port,
        consumer_task: &Arc<Task>,
        dispatcher: Arc<Dispatcher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            producer,
            consumer,
            route: Route::Attached {
                consumer: Arc::downgrade(consumer_task),
                dispatcher,
            },
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn producer(&self) -> Option<&Port> {
        self.producer.as_ref()
    }

    pub fn consumer(&self) -> &Port {
        &self.consumer
    }

    /// True for channels fed by `Pipeline::send` rather than a task
    pub fn is_input(&self) -> bool {
        self.producer.is_none()
    }

    /// Producer identity for diagnostics; input channels report `external`.
    pub fn producer_name(&self) -> String {
        self.producer
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "external".to_string())
    }

    /// Hand `message` to the consumer task.
    ///
    /// Called from outside the pool this blocks while the work queue is full.
    /// Fails if the pipeline is not accepting input or has aborted.
    pub fn send(self: &Arc<Self>, message: Message) -> Result<(), PipelineError> {
        match &self.route {
            Route::Detached => Err(PipelineError::Detached {
                channel: self.id.clone(),
            }),
            Route::Attached {
                consumer,
                dispatcher,
            } => {
                let task = consumer.upgrade().ok_or_else(|| PipelineError::Detached {
                    channel: self.id.clone(),
                })?;
                dispatcher.deliver(task, Arc::clone(self), message)
            }
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("producer", &self.producer)
            .field("consumer", &self.consumer)
            .field("attached", &matches!(self.route, Route::Attached { .. }))
            .finish()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.id,
            self.producer_name(),
            self.consumer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_channel_refuses_messages() {
        let channel = Channel::detached("c", None, Port::new("sink", "input", 0));
        let result = channel.send(Message::new("k", "v"));
        assert_eq!(
            result,
            Err(PipelineError::Detached {
                channel: "c".to_string()
            })
        );
    }

    #[test]
    fn test_display_names_both_endpoints() {
        let channel = Channel::detached(
            "m2r",
            Some(Port::new("mapper", "output", 1)),
            Port::new("reducer", "input", 2),
        );
        assert_eq!(
            channel.to_string(),
            "m2r (mapper:output[1] -> reducer:input[2])"
        );
        assert!(!channel.is_input());

        let input = Channel::detached("in", None, Port::new("mapper", "input", 0));
        assert_eq!(input.producer_name(), "external");
        assert!(input.is_input());
    }
}
