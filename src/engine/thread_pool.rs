// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded-queue thread pool.
//!
//! A fixed set of named worker threads drains one bounded FIFO queue of units of work.
//! The queue is a `crossbeam_channel::bounded` channel, which provides both wait
//! conditions of a classic bounded buffer: `schedule` blocks while the queue is full
//! and workers block while it is empty.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──► Running ──shutdown()──► Draining ──drop()/join()──► Terminated
//! ```
//!
//! * `shutdown` drops the pool's only long-lived sender. Workers keep consuming what is
//!   already queued and exit once the queue is empty, so no queued unit is lost.
//! * `shutdown` is idempotent; `schedule` afterwards fails with [`PoolError::ShutDown`].
//! * Dropping the pool always shuts down and joins every worker.
//!
//! The pool knows nothing about tasks, channels or messages; it runs boxed closures.
//!
//! # Example
//! ```
//! use shardflow::engine::ThreadPool;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let pool = ThreadPool::new(4, 10)?;
//! let counter = Arc::new(AtomicUsize::new(0));
//! for _ in 0..100 {
//!     let counter = Arc::clone(&counter);
//!     pool.schedule(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })?;
//! }
//! let stats = pool.join();
//! assert_eq!(counter.load(Ordering::SeqCst), 100);
//! assert_eq!(stats.completed, 100);
//! # Ok::<(), shardflow::errors::PoolError>(())
//! ```

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;

use crate::errors::PoolError;
use crate::observability::messages::engine::{
    PoolShutdownRequested, PoolStarted, PoolTerminated, QueueSaturated, UnitPanicked,
    WorkerExited,
};
use crate::observability::messages::StructuredLog;

/// A runnable unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static CURRENT_POOL: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Counters describing what a pool has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub workers: usize,
    pub capacity: usize,
    pub scheduled: u64,
    pub completed: u64,
    pub panicked: u64,
    /// Highest queue depth observed right after an enqueue
    pub peak_queued: usize,
}

/// Returned by [`PoolHandle::try_schedule`] with the rejected unit.
pub enum TryScheduleError {
    Full(Job),
    ShutDown(Job),
}

impl TryScheduleError {
    pub fn into_job(self) -> Job {
        match self {
            Self::Full(job) | Self::ShutDown(job) => job,
        }
    }
}

impl fmt::Debug for TryScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::ShutDown(_) => f.write_str("ShutDown(..)"),
        }
    }
}

struct Shared {
    id: usize,
    workers: usize,
    capacity: usize,
    sender: Mutex<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
    scheduled: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
    peak_queued: AtomicUsize,
}

impl Shared {
    fn sender(&self) -> Option<Sender<Job>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_enqueue(&self) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.peak_queued
            .fetch_max(self.receiver.len(), Ordering::SeqCst);
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers,
            capacity: self.capacity,
            scheduled: self.scheduled.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            panicked: self.panicked.load(Ordering::SeqCst),
            peak_queued: self.peak_queued.load(Ordering::SeqCst),
        }
    }
}

/// Cloneable, schedule-only view of a [`ThreadPool`].
///
/// Handles never keep workers alive; once the owning pool shuts down every
/// handle's `schedule` fails.
#[derive(Clone)]
pub struct PoolHandle {
    shared: Arc<Shared>,
}

impl PoolHandle {
    /// Append `work` to the queue, blocking while the queue is at capacity.
    pub fn schedule<F>(&self, work: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_job(Box::new(work))
    }

    pub fn schedule_job(&self, job: Job) -> Result<(), PoolError> {
        let sender = self.shared.sender().ok_or(PoolError::ShutDown)?;
        let job = match sender.try_send(job) {
            Ok(()) => {
                self.shared.record_enqueue();
                return Ok(());
            }
            Err(TrySendError::Full(job)) => job,
            Err(TrySendError::Disconnected(_)) => return Err(PoolError::ShutDown),
        };

        QueueSaturated {
            capacity: self.shared.capacity,
        }
        .log();
        sender.send(job).map_err(|_| PoolError::ShutDown)?;
        self.shared.record_enqueue();
        Ok(())
    }

    /// Enqueue without blocking; hands the unit back when full or shut down.
    pub fn try_schedule(&self, job: Job) -> Result<(), TryScheduleError> {
        let Some(sender) = self.shared.sender() else {
            return Err(TryScheduleError::ShutDown(job));
        };
        match sender.try_send(job) {
            Ok(()) => {
                self.shared.record_enqueue();
                Ok(())
            }
            Err(TrySendError::Full(job)) => Err(TryScheduleError::Full(job)),
            Err(TrySendError::Disconnected(job)) => Err(TryScheduleError::ShutDown(job)),
        }
    }

    /// True when called from one of this pool's worker threads.
    pub fn is_worker_thread(&self) -> bool {
        CURRENT_POOL.with(|current| current.get() == Some(self.shared.id))
    }

    /// Units queued but not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.shared.receiver.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.sender().is_none()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }
}

/// Fixed-size pool of worker threads over a bounded FIFO queue.
pub struct ThreadPool {
    handle: PoolHandle,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `workers` threads draining a queue of at most `capacity` units.
    pub fn new(workers: usize, capacity: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }

        let (sender, receiver) = bounded::<Job>(capacity);
        let shared = Arc::new(Shared {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            workers,
            capacity,
            sender: Mutex::new(Some(sender)),
            receiver,
            scheduled: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            peak_queued: AtomicUsize::new(0),
        });

        let mut pool = Self {
            handle: PoolHandle {
                shared: Arc::clone(&shared),
            },
            workers: Vec::with_capacity(workers),
        };

        for index in 0..workers {
            let shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("shardflow-worker-{}", index))
                .spawn(move || worker_loop(shared));
            match spawned {
                Ok(handle) => pool.workers.push(handle),
                // Dropping `pool` joins whatever did start
                Err(e) => return Err(PoolError::Spawn(e.to_string())),
            }
        }

        PoolStarted { workers, capacity }.log();
        Ok(pool)
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// See [`PoolHandle::schedule`].
    pub fn schedule<F>(&self, work: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.schedule(work)
    }

    /// See [`PoolHandle::try_schedule`].
    pub fn try_schedule(&self, job: Job) -> Result<(), TryScheduleError> {
        self.handle.try_schedule(job)
    }

    pub fn queued(&self) -> usize {
        self.handle.queued()
    }

    pub fn is_worker_thread(&self) -> bool {
        self.handle.is_worker_thread()
    }

    pub fn stats(&self) -> PoolStats {
        self.handle.stats()
    }

    /// Stop accepting work. Already queued units still run. Idempotent.
    pub fn shutdown(&self) {
        let sender = self
            .handle
            .shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            PoolShutdownRequested {
                queued: self.queued(),
            }
            .log();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.handle.is_shut_down()
    }

    /// Shut down, wait for every worker and return the final counters.
    pub fn join(mut self) -> PoolStats {
        self.terminate();
        self.stats()
    }

    fn terminate(&mut self) {
        self.shutdown();
        if self.workers.is_empty() {
            return;
        }
        for worker in self.workers.drain(..) {
            // Units are run under catch_unwind, so a worker only panics on a logging bug
            let _ = worker.join();
        }
        PoolTerminated {
            stats: &self.stats(),
        }
        .log();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    CURRENT_POOL.with(|current| current.set(Some(shared.id)));
    let name = thread::current()
        .name()
        .unwrap_or("shardflow-worker")
        .to_string();
    let mut executed = 0u64;

    // recv only fails once every sender is gone and the queue is empty
    while let Ok(job) = shared.receiver.recv() {
        executed += 1;
        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(()) => {
                shared.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(payload) => {
                shared.panicked.fetch_add(1, Ordering::SeqCst);
                UnitPanicked {
                    worker: &name,
                    reason: &panic_reason(payload.as_ref()),
                }
                .log();
            }
        }
    }

    CURRENT_POOL.with(|current| current.set(None));
    WorkerExited {
        worker: &name,
        executed,
    }
    .log();
}

pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
