// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline assembly and lifecycle.
//!
//! A [`Pipeline`] is built from a validated descriptor: every declared stage becomes one
//! task instance per shard, each task gets a fresh processor from the registry, and the
//! channel graph is wired between task ports. Tasks are kept in topological order
//! (producers before consumers).
//!
//! # Lifecycle
//!
//! ```text
//! assemble() ──► Assembled ──start()──► Running ──stop()──► Stopped
//!                    │                                         ▲
//!                    └──────── start() fails / stop() ─────────┘
//! ```
//!
//! * `start` runs every processor's `start` hook, consumers first, then opens inputs.
//! * `stop` closes inputs, waits for every accepted delivery, runs `done` hooks in
//!   topological order (waiting for the messages each one emits), then drains and joins
//!   the thread pool.
//!
//! # Example
//! ```
//! use shardflow::config::{PipelineConfig, ProcessorRegistry};
//! use shardflow::engine::Pipeline;
//! use shardflow::model::Message;
//!
//! let config: PipelineConfig = serde_yaml::from_str(r#"
//! tasks:
//!   - { name: relay, processor: relay }
//!   - { name: sink, processor: sink }
//! channels:
//!   - { id: in, to: { task: relay } }
//!   - { id: out, from: { task: relay }, to: { task: sink } }
//! "#).unwrap();
//!
//! let registry = ProcessorRegistry::with_builtins();
//! let mut pipeline = Pipeline::assemble(&config, &registry)?;
//! let summary = pipeline.run(vec![("in", Message::new("k", "v"))])?;
//! assert_eq!(summary.delivered, 2);
//! # Ok::<(), shardflow::errors::PipelineError>(())
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::{validate_pipeline, PipelineConfig, ProcessorRegistry};
use crate::engine::dispatcher::Dispatcher;
use crate::engine::thread_pool::{PoolStats, ThreadPool};
use crate::errors::{PipelineError, ValidationError};
use crate::model::{Channel, Message, Port, Shard, Task};
use crate::observability::messages::pipeline::{
    PipelineAssembled, PipelineStartFailed, PipelineStopped, TaskDone, TaskStarted,
};
use crate::observability::messages::validation::DescriptorRejected;
use crate::observability::messages::StructuredLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Assembled,
    Running,
    Stopped,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assembled => "assembled",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stopped pipeline did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    /// Deliveries handed to a processor's `receive`
    pub delivered: u64,
    /// Deliveries released unprocessed after a fatal failure
    pub discarded: u64,
    /// Milliseconds between `start` and the end of `stop`
    pub duration_ms: u64,
    pub pool: PoolStats,
}

pub struct Pipeline {
    /// Topological order: producers before consumers
    tasks: Vec<Arc<Task>>,
    channels: Vec<Arc<Channel>>,
    inputs: HashMap<String, Arc<Channel>>,
    dispatcher: Arc<Dispatcher>,
    pool: Option<ThreadPool>,
    state: PipelineState,
    started_at: Option<Instant>,
    outcome: Option<Result<PipelineSummary, PipelineError>>,
}

impl Pipeline {
    /// Validate `config`, instantiate every task through `registry` and wire channels.
    pub fn assemble(
        config: &PipelineConfig,
        registry: &ProcessorRegistry,
    ) -> Result<Self, PipelineError> {
        if let Err(errors) = validate_pipeline(config) {
            for error in &errors {
                DescriptorRejected { error }.log();
            }
            return Err(PipelineError::Invalid(errors));
        }

        let mut declared: Vec<Arc<Task>> = Vec::new();
        for stage in &config.tasks {
            for (index, instance) in stage.instance_names().into_iter().enumerate() {
                let processor =
                    registry
                        .create(&stage.processor)
                        .map_err(|source| PipelineError::Registry {
                            task: instance.clone(),
                            source,
                        })?;
                declared.push(Arc::new(Task::new(
                    instance,
                    stage.name.clone(),
                    Shard {
                        index,
                        count: stage.shards,
                    },
                    stage.processor.clone(),
                    stage.params.clone(),
                    processor,
                )));
            }
        }
        let by_name: HashMap<&str, &Arc<Task>> =
            declared.iter().map(|t| (t.name(), t)).collect();

        let workers = config.executor.workers();
        let capacity = config.executor.queue_capacity();
        let pool = ThreadPool::new(workers, capacity)?;
        let dispatcher = Arc::new(Dispatcher::new(pool.handle()));

        let mut channels = Vec::with_capacity(config.channels.len());
        let mut inputs = HashMap::new();
        let mut sources: HashMap<&str, Vec<Arc<Channel>>> = HashMap::new();
        let mut sinks: HashMap<&str, Vec<Arc<Channel>>> = HashMap::new();

        for channel_cfg in &config.channels {
            let consumer_task = by_name.get(channel_cfg.to.task.as_str()).ok_or_else(|| {
                PipelineError::Invalid(vec![ValidationError::UnresolvedTask {
                    channel: channel_cfg.id.clone(),
                    task: channel_cfg.to.task.clone(),
                }])
            })?;
            let producer = channel_cfg.from.as_ref().map(|from| {
                Port::new(
                    from.task.clone(),
                    channel_cfg.producer_port().unwrap_or_default(),
                    from.shard,
                )
            });
            let consumer = Port::new(
                channel_cfg.to.task.clone(),
                channel_cfg.consumer_port(),
                channel_cfg.to.shard,
            );

            let channel = Channel::attached(
                channel_cfg.id.clone(),
                producer,
                consumer,
                consumer_task,
                Arc::clone(&dispatcher),
            );

            sources
                .entry(consumer_task.name())
                .or_default()
                .push(Arc::clone(&channel));
            match &channel_cfg.from {
                Some(from) => sinks
                    .entry(from.task.as_str())
                    .or_default()
                    .push(Arc::clone(&channel)),
                None => {
                    inputs.insert(channel_cfg.id.clone(), Arc::clone(&channel));
                }
            }
            channels.push(channel);
        }

        for task in &declared {
            task.wire(
                sources.remove(task.name()).unwrap_or_default(),
                sinks.remove(task.name()).unwrap_or_default(),
            );
        }

        let tasks = topological_order(&declared, &channels)?;

        PipelineAssembled {
            tasks: tasks.len(),
            channels: channels.len(),
            workers,
            capacity,
        }
        .log();

        Ok(Self {
            tasks,
            channels,
            inputs,
            dispatcher,
            pool: Some(pool),
            state: PipelineState::Assembled,
            started_at: None,
            outcome: None,
        })
    }

    /// Run every processor's `start` hook, consumers first, and open input channels.
    ///
    /// If a hook fails the pipeline is torn down and the error names the failing task.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.state != PipelineState::Assembled {
            return Err(PipelineError::InvalidState {
                operation: "start",
                state: self.state.as_str(),
            });
        }
        self.started_at = Some(Instant::now());

        let tasks = self.tasks.clone();
        for task in tasks.iter().rev() {
            let started = TaskStarted {
                task: task.name(),
                processor: task.processor_name(),
            };
            let span = started.span("start");
            let _guard = span.enter();
            started.log();

            if let Err(error) = self.dispatcher.run_hook(task, Task::start) {
                PipelineStartFailed {
                    task: task.name(),
                    error: &error,
                }
                .log();
                self.dispatcher.fail(error.clone());
                self.teardown();
                return Err(error);
            }
        }

        self.dispatcher.open_inputs();
        self.state = PipelineState::Running;
        Ok(())
    }

    /// Inject `message` on the input channel `input`.
    ///
    /// Blocks while the work queue is full.
    pub fn send(&self, input: &str, message: Message) -> Result<(), PipelineError> {
        if self.state == PipelineState::Assembled {
            return Err(PipelineError::InvalidState {
                operation: "send to",
                state: self.state.as_str(),
            });
        }
        self.input(input)?.send(message)
    }

    /// The input channel `id`, for producers that feed the pipeline directly.
    pub fn input(&self, id: &str) -> Result<Arc<Channel>, PipelineError> {
        self.inputs
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownInput {
                channel: id.to_string(),
            })
    }

    /// Input channel ids, sorted
    pub fn input_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.inputs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Start (if needed), send every `(input, message)` pair in order, then stop.
    pub fn run<I, S>(&mut self, inputs: I) -> Result<PipelineSummary, PipelineError>
    where
        I: IntoIterator<Item = (S, Message)>,
        S: AsRef<str>,
    {
        if self.state == PipelineState::Assembled {
            self.start()?;
        }
        for (input, message) in inputs {
            if let Err(error) = self.send(input.as_ref(), message) {
                // A latched processor failure is the root cause; report it over the rejection
                return match self.stop() {
                    Err(failure) => Err(failure),
                    Ok(_) => Err(error),
                };
            }
        }
        self.stop()
    }

    /// Close inputs, let in-flight work finish, run `done` hooks and join the pool.
    ///
    /// Returns the first fatal error raised by any processor, if there was one.
    /// Calling `stop` again returns the same outcome.
    pub fn stop(&mut self) -> Result<PipelineSummary, PipelineError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        self.dispatcher.close_inputs();
        if self.state == PipelineState::Running {
            self.dispatcher.wait_idle();
            for task in &self.tasks {
                if self.dispatcher.failure().is_some() {
                    break;
                }
                let done = TaskDone { task: task.name() };
                let span = done.span("done");
                let _guard = span.enter();
                done.log();

                if let Err(error) = self.dispatcher.run_hook(task, Task::done) {
                    self.dispatcher.fail(error);
                }
                // Messages emitted by `done` reach downstream tasks before their own `done`
                self.dispatcher.wait_idle();
            }
        }

        self.teardown().clone()
    }

    fn teardown(&mut self) -> &Result<PipelineSummary, PipelineError> {
        let pool = match self.pool.take() {
            Some(pool) => pool.join(),
            None => PoolStats::default(),
        };
        let duration = self
            .started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        let summary = PipelineSummary {
            delivered: self.dispatcher.delivered(),
            discarded: self.dispatcher.discarded(),
            duration_ms: duration.as_millis() as u64,
            pool,
        };
        PipelineStopped {
            delivered: summary.delivered,
            discarded: summary.discarded,
            duration,
        }
        .log();

        self.state = PipelineState::Stopped;
        let outcome = match self.dispatcher.failure() {
            Some(failure) => Err(failure),
            None => Ok(summary),
        };
        self.outcome.insert(outcome)
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Tasks in topological order
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    pub fn channels(&self) -> &[Arc<Channel>] {
        &self.channels
    }

    /// The first fatal error, if one has been latched
    pub fn failure(&self) -> Option<PipelineError> {
        self.dispatcher.failure()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            let _ = self.stop();
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state)
            .field("tasks", &self.tasks.len())
            .field("channels", &self.channels.len())
            .field("inputs", &self.input_ids())
            .finish()
    }
}

/// Kahn's algorithm over task instances; ties keep declaration order.
fn topological_order(
    declared: &[Arc<Task>],
    channels: &[Arc<Channel>],
) -> Result<Vec<Arc<Task>>, PipelineError> {
    let index: HashMap<&str, usize> = declared
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name(), i))
        .collect();
    let mut in_degree = vec![0usize; declared.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); declared.len()];

    for channel in channels {
        let Some(producer) = channel.producer() else {
            continue;
        };
        if let (Some(&from), Some(&to)) = (
            index.get(producer.task()),
            index.get(channel.consumer().task()),
        ) {
            adjacency[from].push(to);
            in_degree[to] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..declared.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(declared.len());
    while let Some(node) = queue.pop_front() {
        order.push(Arc::clone(&declared[node]));
        for &next in &adjacency[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != declared.len() {
        let cycle = (0..declared.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| declared[i].name().to_string())
            .collect();
        return Err(PipelineError::Invalid(vec![ValidationError::CyclicGraph {
            cycle,
        }]));
    }

    Ok(order)
}
