// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message delivery onto the thread pool.
//!
//! Every send pushes the message on the consumer task's mailbox and schedules one unit.
//! A unit locks the task's processor and handles the mailbox *front*, so units for the
//! same task never overlap and messages are handled in the order they were pushed,
//! whichever worker happens to run which unit.
//!
//! Sends issued from a worker thread never block on the queue: when the queue is full
//! the unit runs inline on the sending worker. Only external producers feel backpressure,
//! which keeps a bounded queue free of worker-on-worker deadlock for acyclic pipelines.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::engine::thread_pool::{panic_reason, Job, PoolHandle, TryScheduleError};
use crate::errors::PipelineError;
use crate::model::task::Delivery;
use crate::model::{Channel, Message, Task};
use crate::observability::messages::engine::CallerRuns;
use crate::observability::messages::pipeline::{DeliveryDiscarded, DeliveryFailed};
use crate::observability::messages::StructuredLog;

/// Counts deliveries accepted but not yet handled.
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) {
        *self.lock() += 1;
    }

    fn exit(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut count = self.lock();
        while *count > 0 {
            count = self
                .idle
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

struct ExitOnDrop<'a>(&'a InFlight);

impl Drop for ExitOnDrop<'_> {
    fn drop(&mut self) {
        self.0.exit();
    }
}

pub(crate) struct Dispatcher {
    pool: PoolHandle,
    in_flight: InFlight,
    accepting: AtomicBool,
    failure: Mutex<Option<PipelineError>>,
    delivered: AtomicU64,
    discarded: AtomicU64,
}

impl Dispatcher {
    pub(crate) fn new(pool: PoolHandle) -> Self {
        Self {
            pool,
            in_flight: InFlight::new(),
            accepting: AtomicBool::new(false),
            failure: Mutex::new(None),
            delivered: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    pub(crate) fn deliver(
        self: &Arc<Self>,
        task: Arc<Task>,
        channel: Arc<Channel>,
        message: Message,
    ) -> Result<(), PipelineError> {
        // Enter before checking admission so that `stop` cannot miss this delivery
        self.in_flight.enter();
        if let Err(e) = self.admit(&channel) {
            self.in_flight.exit();
            return Err(e);
        }

        task.enqueue(Delivery { channel, message });

        let dispatcher = Arc::clone(self);
        let target = Arc::clone(&task);
        let unit: Job = Box::new(move || dispatcher.run_next(&target));

        if !self.pool.is_worker_thread() {
            return self.pool.schedule_job(unit).map_err(|e| {
                // The message stays queued on the task and is released with it
                self.in_flight.exit();
                e.into()
            });
        }

        if let Err(rejected) = self.pool.try_schedule(unit) {
            let reason = match rejected {
                TryScheduleError::Full(_) => "queue full",
                TryScheduleError::ShutDown(_) => "pool draining",
            };
            let inline = CallerRuns {
                task: task.name(),
                reason,
            };
            let span = inline.span("deliver");
            let _guard = span.enter();
            inline.log();
            (rejected.into_job())();
        }
        Ok(())
    }

    fn admit(&self, channel: &Channel) -> Result<(), PipelineError> {
        if let Some(cause) = self.failure() {
            return Err(PipelineError::Aborted {
                reason: cause.to_string(),
            });
        }
        if channel.is_input() && !self.accepting.load(Ordering::SeqCst) {
            return Err(PipelineError::InputClosed {
                channel: channel.id().to_string(),
            });
        }
        Ok(())
    }

    fn run_next(&self, task: &Task) {
        let _in_flight = ExitOnDrop(&self.in_flight);

        let mut processor = match task.lock_processor() {
            Ok(processor) => processor,
            Err(e) => {
                if let Some(delivery) = task.dequeue() {
                    self.discard(task, delivery);
                }
                self.fail(e);
                return;
            }
        };

        let Some(Delivery { channel, message }) = task.dequeue() else {
            return;
        };

        if self.is_failed() {
            self.discard(task, Delivery { channel, message });
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            processor.receive(&channel, message)
        }));
        self.delivered.fetch_add(1, Ordering::SeqCst);

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(payload) => PipelineError::ProcessorPanicked {
                task: task.name().to_string(),
                reason: panic_reason(payload.as_ref()),
            },
        };
        DeliveryFailed {
            task: task.name(),
            channel: channel.id(),
            error: &error,
        }
        .log();
        self.fail(error);
    }

    fn discard(&self, task: &Task, delivery: Delivery) {
        self.discarded.fetch_add(1, Ordering::SeqCst);
        DeliveryDiscarded {
            task: task.name(),
            channel: delivery.channel.id(),
        }
        .log();
        delivery.message.release();
    }

    /// Run a lifecycle hook (`start` / `done`), turning a panic into an error.
    pub(crate) fn run_hook<F>(&self, task: &Task, hook: F) -> Result<(), PipelineError>
    where
        F: FnOnce(&Task) -> Result<(), PipelineError>,
    {
        panic::catch_unwind(AssertUnwindSafe(|| hook(task))).unwrap_or_else(|payload| {
            Err(PipelineError::ProcessorPanicked {
                task: task.name().to_string(),
                reason: panic_reason(payload.as_ref()),
            })
        })
    }

    /// Latch a fatal error; the first one wins.
    pub(crate) fn fail(&self, error: PipelineError) {
        let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    pub(crate) fn failure(&self) -> Option<PipelineError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_failed(&self) -> bool {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn open_inputs(&self) {
        self.accepting.store(true, Ordering::SeqCst);
    }

    pub(crate) fn close_inputs(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Block until every accepted delivery has been handled or discarded.
    pub(crate) fn wait_idle(&self) {
        self.in_flight.wait_idle();
    }

    pub(crate) fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub(crate) fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::SinkProcessor;
    use crate::engine::ThreadPool;
    use crate::model::{Port, Shard};
    use std::collections::HashMap;

    fn sink_task() -> Arc<Task> {
        Arc::new(Task::new(
            "end",
            "end",
            Shard::default(),
            "sink",
            HashMap::new(),
            Box::new(SinkProcessor::new()),
        ))
    }

    #[test]
    fn test_first_failure_wins() {
        let pool = ThreadPool::new(1, 1).unwrap();
        let dispatcher = Dispatcher::new(pool.handle());
        assert!(dispatcher.failure().is_none());

        dispatcher.fail(PipelineError::processor("a", "first"));
        dispatcher.fail(PipelineError::processor("b", "second"));
        assert_eq!(
            dispatcher.failure(),
            Some(PipelineError::processor("a", "first"))
        );
    }

    #[test]
    fn test_input_admission_follows_accepting_flag() {
        let pool = ThreadPool::new(2, 4).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(pool.handle()));
        let task = sink_task();
        let input = Channel::attached(
            "in",
            None,
            Port::new("end", "input", 0),
            &task,
            Arc::clone(&dispatcher),
        );

        assert_eq!(
            input.send(Message::new("k", "v")),
            Err(PipelineError::InputClosed {
                channel: "in".into()
            })
        );

        dispatcher.open_inputs();
        for _ in 0..10 {
            input.send(Message::new("k", "v")).unwrap();
        }
        dispatcher.wait_idle();
        assert_eq!(dispatcher.delivered(), 10);
        assert_eq!(task.pending(), 0);

        dispatcher.fail(PipelineError::processor("end", "boom"));
        assert!(matches!(
            input.send(Message::new("k", "v")),
            Err(PipelineError::Aborted { .. })
        ));
    }

    #[test]
    fn test_hook_panic_becomes_error() {
        let pool = ThreadPool::new(1, 1).unwrap();
        let dispatcher = Dispatcher::new(pool.handle());
        let task = sink_task();

        let result = dispatcher.run_hook(&task, |_| panic!("hook exploded"));
        assert_eq!(
            result,
            Err(PipelineError::ProcessorPanicked {
                task: "end".into(),
                reason: "hook exploded".into(),
            })
        );
    }
}
