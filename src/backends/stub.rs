// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test-only processors.

use std::sync::{Arc, Mutex};

use crate::config::consts::DEFAULT_OUTPUT_PORT;
use crate::config::ProcessorRegistry;
use crate::errors::PipelineError;
use crate::model::{Channel, Message, Task};
use crate::traits::Processor;

/// One delivery seen by a [`RecordingProcessor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub task: String,
    pub channel: String,
    pub key: String,
    pub value: String,
}

/// Shared log of deliveries and lifecycle events
#[derive(Clone, Default)]
pub struct Recorder {
    received: Arc<Mutex<Vec<Received>>>,
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// Deliveries seen by `task`, in arrival order
    pub fn received_by(&self, task: &str) -> Vec<Received> {
        self.received()
            .into_iter()
            .filter(|r| r.task == task)
            .collect()
    }

    /// `start:<task>` / `done:<task>` in call order
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, channel: &Channel, message: &Message) {
        self.received.lock().unwrap().push(Received {
            task: channel.consumer().task().to_string(),
            channel: channel.id().to_string(),
            key: message.key_lossy().into_owned(),
            value: message.value_lossy().into_owned(),
        });
    }

    fn event(&self, kind: &str, task: &Task) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", kind, task.name()));
    }
}

/// Records every delivery; optionally forwards it to the `output` sink.
pub struct RecordingProcessor {
    recorder: Recorder,
    forward: bool,
    sink: Option<Arc<Channel>>,
}

impl RecordingProcessor {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            forward: false,
            sink: None,
        }
    }

    pub fn forwarding(recorder: Recorder) -> Self {
        Self {
            forward: true,
            ..Self::new(recorder)
        }
    }
}

impl Processor for RecordingProcessor {
    fn start(&mut self, task: &Task) -> Result<(), PipelineError> {
        self.recorder.event("start", task);
        if self.forward {
            self.sink = task.sink(DEFAULT_OUTPUT_PORT)?;
        }
        Ok(())
    }

    fn receive(&mut self, channel: &Channel, message: Message) -> Result<(), PipelineError> {
        self.recorder.record(channel, &message);
        match &self.sink {
            Some(sink) => sink.send(message),
            None => {
                message.release();
                Ok(())
            }
        }
    }

    fn done(&mut self, task: &Task) -> Result<(), PipelineError> {
        self.recorder.event("done", task);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "record"
    }
}

/// Fails on messages whose key is `fail`
pub struct FailingProcessor;

impl Processor for FailingProcessor {
    fn receive(&mut self, channel: &Channel, message: Message) -> Result<(), PipelineError> {
        if message.key() == b"fail" {
            return Err(PipelineError::processor(
                channel.consumer().task(),
                "simulated processor failure",
            ));
        }
        message.release();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Panics on messages whose key is `panic`
pub struct PanickingProcessor;

impl Processor for PanickingProcessor {
    fn receive(&mut self, _channel: &Channel, message: Message) -> Result<(), PipelineError> {
        if message.key() == b"panic" {
            panic!("simulated processor panic");
        }
        message.release();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

/// Holds every message until `done`, then forwards them all in arrival order
pub struct BatchingProcessor {
    sink: Option<Arc<Channel>>,
    held: Vec<Message>,
}

impl BatchingProcessor {
    pub fn new() -> Self {
        Self {
            sink: None,
            held: Vec::new(),
        }
    }
}

impl Processor for BatchingProcessor {
    fn start(&mut self, task: &Task) -> Result<(), PipelineError> {
        self.sink = task.sink(DEFAULT_OUTPUT_PORT)?;
        Ok(())
    }

    fn receive(&mut self, _channel: &Channel, message: Message) -> Result<(), PipelineError> {
        self.held.push(message);
        Ok(())
    }

    fn done(&mut self, _task: &Task) -> Result<(), PipelineError> {
        for message in self.held.drain(..) {
            match &self.sink {
                Some(sink) => sink.send(message)?,
                None => message.release(),
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "batching"
    }
}

/// Built-ins plus every stub processor, all reporting into `recorder`
pub fn stub_registry(recorder: &Recorder) -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::with_builtins();
    let terminal = recorder.clone();
    registry
        .register("record", move || Box::new(RecordingProcessor::new(terminal.clone())))
        .unwrap();
    let forwarding = recorder.clone();
    registry
        .register("record_forward", move || {
            Box::new(RecordingProcessor::forwarding(forwarding.clone()))
        })
        .unwrap();
    registry
        .register("failing", || Box::new(FailingProcessor))
        .unwrap();
    registry
        .register("panicking", || Box::new(PanickingProcessor))
        .unwrap();
    registry
        .register("batching", || Box::new(BatchingProcessor::new()))
        .unwrap();
    registry
}
