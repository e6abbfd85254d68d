// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Task instances.
//!
//! A task owns one processor instance, a FIFO mailbox of pending deliveries and its
//! channel wiring. Wiring is set once during assembly and is read-only afterwards, so
//! processors can cache sinks in `start` without further synchronization.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;

use crate::errors::PipelineError;
use crate::model::{Channel, Message};
use crate::traits::Processor;

/// Position of a task instance within its sharded stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shard {
    pub index: usize,
    pub count: usize,
}

impl Default for Shard {
    fn default() -> Self {
        Self { index: 0, count: 1 }
    }
}

pub(crate) struct Delivery {
    pub channel: Arc<Channel>,
    pub message: Message,
}

#[derive(Default)]
struct Wiring {
    sources: Vec<Arc<Channel>>,
    sinks: Vec<Arc<Channel>>,
}

pub struct Task {
    name: String,
    stage: String,
    shard: Shard,
    processor_name: String,
    params: HashMap<String, serde_yaml::Value>,
    wiring: OnceLock<Wiring>,
    processor: Mutex<Box<dyn Processor>>,
    inbox: Mutex<VecDeque<Delivery>>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        stage: impl Into<String>,
        shard: Shard,
        processor_name: impl Into<String>,
        params: HashMap<String, serde_yaml::Value>,
        processor: Box<dyn Processor>,
    ) -> Self {
        Self {
            name: name.into(),
            stage: stage.into(),
            shard,
            processor_name: processor_name.into(),
            params,
            wiring: OnceLock::new(),
            processor: Mutex::new(processor),
            inbox: Mutex::new(VecDeque::new()),
        }
    }

    /// Instance name, e.g. `reducer` or `mapper.1` for sharded stages
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared stage name shared by all shards
    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn shard(&self) -> Shard {
        self.shard
    }

    /// Registry name the processor was created from
    pub fn processor_name(&self) -> &str {
        &self.processor_name
    }

    pub fn param(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.params.get(name)
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(|v| v.as_str())
    }

    /// Bind source and sink channels. Returns `false` if the task was already wired.
    pub fn wire(&self, sources: Vec<Arc<Channel>>, sinks: Vec<Arc<Channel>>) -> bool {
        self.wiring.set(Wiring { sources, sinks }).is_ok()
    }

    pub fn sources(&self) -> &[Arc<Channel>] {
        self.wiring.get().map(|w| w.sources.as_slice()).unwrap_or(&[])
    }

    pub fn sinks(&self) -> &[Arc<Channel>] {
        self.wiring.get().map(|w| w.sinks.as_slice()).unwrap_or(&[])
    }

    /// Sinks bound to `port`, ordered by producer shard.
    pub fn sinks_on(&self, port: &str) -> Vec<Arc<Channel>> {
        let mut sinks: Vec<Arc<Channel>> = self
            .sinks()
            .iter()
            .filter(|c| c.producer().is_some_and(|p| p.name() == port))
            .cloned()
            .collect();
        sinks.sort_by_key(|c| c.producer().map(|p| p.shard()).unwrap_or_default());
        sinks
    }

    /// The single sink bound to `port`, if any.
    pub fn sink(&self, port: &str) -> Result<Option<Arc<Channel>>, PipelineError> {
        let mut sinks = self.sinks_on(port);
        match sinks.len() {
            0 => Ok(None),
            1 => Ok(sinks.pop()),
            count => Err(PipelineError::AmbiguousSink {
                task: self.name.clone(),
                port: port.to_string(),
                count,
            }),
        }
    }

    /// Sinks bound to `port` indexed by producer shard; shards must be `0..n` without gaps.
    pub fn sinks_by_shard(&self, port: &str) -> Result<Vec<Arc<Channel>>, PipelineError> {
        let sinks = self.sinks_on(port);
        for (index, sink) in sinks.iter().enumerate() {
            let shard = sink.producer().map(|p| p.shard()).unwrap_or_default();
            if shard != index {
                return Err(PipelineError::MissingSinkShard {
                    task: self.name.clone(),
                    port: port.to_string(),
                    shard: index,
                });
            }
        }
        Ok(sinks)
    }

    /// Run the processor's `start` hook.
    pub fn start(&self) -> Result<(), PipelineError> {
        let mut processor = self.lock_processor()?;
        processor.start(self)
    }

    /// Run the processor's `done` hook.
    pub fn done(&self) -> Result<(), PipelineError> {
        let mut processor = self.lock_processor()?;
        processor.done(self)
    }

    /// Deliveries waiting for this task
    pub fn pending(&self) -> usize {
        self.inbox().len()
    }

    pub(crate) fn lock_processor(
        &self,
    ) -> Result<MutexGuard<'_, Box<dyn Processor>>, PipelineError> {
        self.processor
            .lock()
            .map_err(|_| PipelineError::ProcessorPanicked {
                task: self.name.clone(),
                reason: "processor lock poisoned by an earlier panic".to_string(),
            })
    }

    pub(crate) fn enqueue(&self, delivery: Delivery) {
        self.inbox().push_back(delivery);
    }

    pub(crate) fn dequeue(&self) -> Option<Delivery> {
        self.inbox().pop_front()
    }

    fn inbox(&self) -> MutexGuard<'_, VecDeque<Delivery>> {
        // Only push/pop happen under this lock; a poisoned guard still holds a valid queue
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("processor", &self.processor_name)
            .field("shard", &self.shard)
            .field("sources", &self.sources().len())
            .field("sinks", &self.sinks().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::SinkProcessor;
    use crate::model::Port;

    fn task(name: &str) -> Task {
        Task::new(
            name,
            name,
            Shard::default(),
            "sink",
            HashMap::new(),
            Box::new(SinkProcessor::new()),
        )
    }

    fn out(id: &str, task: &str, port: &str, shard: usize) -> Arc<Channel> {
        Channel::detached(
            id,
            Some(Port::new(task, port, shard)),
            Port::new("next", "input", 0),
        )
    }

    #[test]
    fn test_sinks_by_shard_orders_by_producer_shard() {
        let t = task("router");
        assert!(t.wire(
            vec![],
            vec![
                out("c2", "router", "output", 2),
                out("c0", "router", "output", 0),
                out("other", "router", "debug", 0),
                out("c1", "router", "output", 1),
            ],
        ));

        let ids: Vec<String> = t
            .sinks_by_shard("output")
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(ids, vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn test_sinks_by_shard_rejects_gaps() {
        let t = task("router");
        t.wire(
            vec![],
            vec![out("c0", "router", "output", 0), out("c2", "router", "output", 2)],
        );

        assert_eq!(
            t.sinks_by_shard("output").err(),
            Some(PipelineError::MissingSinkShard {
                task: "router".into(),
                port: "output".into(),
                shard: 1,
            })
        );
    }

    #[test]
    fn test_single_sink_lookup() {
        let t = task("relay");
        t.wire(vec![], vec![out("a", "relay", "output", 0)]);
        assert_eq!(t.sink("output").unwrap().unwrap().id(), "a");
        assert!(t.sink("missing").unwrap().is_none());

        let t = task("relay");
        t.wire(
            vec![],
            vec![out("a", "relay", "output", 0), out("b", "relay", "output", 1)],
        );
        assert!(matches!(
            t.sink("output"),
            Err(PipelineError::AmbiguousSink { count: 2, .. })
        ));
    }

    #[test]
    fn test_wiring_is_set_once() {
        let t = task("t");
        assert!(t.sinks().is_empty());
        assert!(t.wire(vec![], vec![]));
        assert!(!t.wire(vec![], vec![out("late", "t", "output", 0)]));
        assert!(t.sinks().is_empty());
    }
}
