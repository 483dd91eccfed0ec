//! Bounded pool of named worker threads.

use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool `{0}` is shut down")]
    ShutDown(String),
    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Sizing of a [`WorkerPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Thread names are `<name>-<n>`.
    pub name: String,
    /// Threads kept alive while idle.
    pub min: usize,
    /// Upper bound on threads.
    pub max: usize,
    /// Jobs that may wait for a thread before `submit` blocks.
    pub capacity: usize,
    /// Idle time after which threads above `min` exit.
    pub keep_alive: Duration,
}

impl PoolSettings {
    /// A pool of exactly `size` threads that are never evicted.
    pub fn fixed(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            min: size,
            max: size,
            capacity: size,
            keep_alive: Duration::MAX,
        }
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<Job>,
    workers: usize,
    idle: usize,
    spawned: usize,
    shutdown: bool,
    handles: Vec<JoinHandle<()>>,
}

struct Shared {
    settings: PoolSettings,
    state: Mutex<State>,
    /// Signalled when a job is queued or the pool shuts down.
    jobs: Condvar,
    /// Signalled when a submitter may be able to make progress.
    space: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread pool with bounded queue and blocking submission.
///
/// A job goes to an idle thread if there is one, otherwise to a new thread
/// while fewer than `max` exist, otherwise into the queue while it holds
/// fewer than `capacity` jobs. When all of that fails `submit` blocks, which
/// slows down whoever feeds the pool.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                state: Mutex::new(State::default()),
                jobs: Condvar::new(),
                space: Condvar::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.settings.name
    }

    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let job: Job = Box::new(job);
        let settings = &self.shared.settings;
        let mut state = self.shared.lock();
        loop {
            if state.shutdown {
                return Err(PoolError::ShutDown(settings.name.clone()));
            }

            if state.idle > state.queue.len() {
                state.queue.push_back(job);
                self.shared.jobs.notify_one();
                return Ok(());
            }

            if state.workers < settings.max {
                return self.spawn(&mut state, job);
            }

            if state.queue.len() < settings.capacity {
                state.queue.push_back(job);
                self.shared.jobs.notify_one();
                return Ok(());
            }

            debug!(pool = settings.name.as_str(), "Pool saturated, waiting for space");
            state = self
                .shared
                .space
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn spawn(&self, state: &mut State, job: Job) -> Result<(), PoolError> {
        state.spawned += 1;
        let name = format!("{}-{}", self.shared.settings.name, state.spawned);
        let shared = self.shared.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || work(shared, job))?;

        state.workers += 1;
        state.handles.retain(|handle| !handle.is_finished());
        state.handles.push(handle);
        debug!(worker = name.as_str(), workers = state.workers, "Started worker");
        Ok(())
    }

    /// Rejects further submissions. Queued jobs still run.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        state.shutdown = true;
        self.shared.jobs.notify_all();
        self.shared.space.notify_all();
    }

    /// Waits for every thread started by the pool to exit.
    pub fn join(&self) {
        let handles = std::mem::take(&mut self.shared.lock().handles);
        for handle in handles {
            let name = handle.thread().name().unwrap_or_default().to_string();
            if handle.join().is_err() {
                warn!(worker = name.as_str(), "Worker thread panicked");
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.shared.lock().workers
    }

    pub fn idle_count(&self) -> usize {
        self.shared.lock().idle
    }

    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }
}

fn work(shared: Arc<Shared>, first: Job) {
    let mut job = first;
    loop {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!("Job panicked");
        }

        let mut state = shared.lock();
        state.idle += 1;
        shared.space.notify_all();

        let next = loop {
            if let Some(job) = state.queue.pop_front() {
                shared.space.notify_all();
                break Some(job);
            }
            if state.shutdown {
                break None;
            }
            if state.workers > shared.settings.min {
                let (guard, wait) = shared
                    .jobs
                    .wait_timeout(state, shared.settings.keep_alive)
                    .unwrap_or_else(PoisonError::into_inner);
                state = guard;
                if wait.timed_out() && state.queue.is_empty() && state.workers > shared.settings.min
                {
                    debug!(workers = state.workers, "Evicting idle worker");
                    break None;
                }
            } else {
                state = shared.jobs.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
        };

        state.idle -= 1;
        match next {
            Some(next) => job = next,
            None => {
                state.workers -= 1;
                shared.space.notify_all();
                return;
            }
        }
    }
}
