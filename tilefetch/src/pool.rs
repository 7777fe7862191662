//! Resizable FIFO worker pool.
//!
//! Jobs run in submission order on a set of named worker threads. The number
//! of workers can be changed while jobs are queued or running: growing spawns
//! workers immediately, shrinking lets surplus workers exit once they finish
//! their current job. The queue is untouched by a resize.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use tilefetch::pool::JobPool;
//!
//! let pool = JobPool::new("demo", 2);
//! let counter = Arc::new(AtomicUsize::new(0));
//! for _ in 0..10 {
//!     let counter = Arc::clone(&counter);
//!     pool.execute(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     });
//! }
//! pool.wait_idle();
//! assert_eq!(counter.load(Ordering::SeqCst), 10);
//! pool.shutdown();
//! ```

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    queue: VecDeque<Job>,
    /// Desired worker count
    target: usize,
    /// Workers currently alive
    live: usize,
    /// Workers currently running a job
    active: usize,
    shutdown: bool,
    next_worker_id: usize,
}

struct Shared {
    name: String,
    state: Mutex<PoolState>,
    work_ready: Condvar,
    idle: Condvar,
}

/// A pool of worker threads consuming a shared FIFO queue.
pub struct JobPool {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl JobPool {
    /// Create a pool with `size` workers (at least one).
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        let size = size.max(1);
        let pool = Self {
            shared: Arc::new(Shared {
                name: name.into(),
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    target: size,
                    live: 0,
                    active: 0,
                    shutdown: false,
                    next_worker_id: 0,
                }),
                work_ready: Condvar::new(),
                idle: Condvar::new(),
            }),
            handles: Mutex::new(Vec::new()),
        };

        {
            let mut state = pool.shared.state.lock();
            pool.spawn_workers(&mut state, size);
        }
        debug!(pool = %pool.shared.name, workers = size, "Worker pool started");
        pool
    }

    /// Queue a job. Returns `false` if the pool has been shut down.
    pub fn execute<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return false;
        }
        state.queue.push_back(Box::new(job));
        trace!(pool = %self.shared.name, queued = state.queue.len(), "Job queued");
        drop(state);
        self.shared.work_ready.notify_one();
        true
    }

    /// Drop every job that has not started yet and return how many were removed.
    ///
    /// Running jobs are not interrupted.
    pub fn clear_queue(&self) -> usize {
        let mut state = self.shared.state.lock();
        let removed = state.queue.len();
        state.queue.clear();
        if state.active == 0 {
            self.shared.idle.notify_all();
        }
        removed
    }

    /// Change the number of workers (at least one).
    ///
    /// Surplus workers exit after their current job; queued jobs are kept.
    pub fn resize(&self, size: usize) {
        let size = size.max(1);
        let mut state = self.shared.state.lock();
        if state.shutdown || state.target == size {
            return;
        }

        debug!(pool = %self.shared.name, from = state.target, to = size, "Resizing worker pool");
        state.target = size;
        if state.live < size {
            let missing = size - state.live;
            self.spawn_workers(&mut state, missing);
        } else {
            drop(state);
            self.shared.work_ready.notify_all();
        }
    }

    /// Desired number of workers.
    pub fn size(&self) -> usize {
        self.shared.state.lock().target
    }

    /// Workers currently alive. Lags [`size`](Self::size) briefly after a shrink.
    pub fn live_workers(&self) -> usize {
        self.shared.state.lock().live
    }

    /// Jobs waiting to start.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Jobs currently running.
    pub fn active(&self) -> usize {
        self.shared.state.lock().active
    }

    /// Block until the queue is empty and no job is running.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        while !state.queue.is_empty() || state.active > 0 {
            self.shared.idle.wait(&mut state);
        }
    }

    /// Like [`wait_idle`](Self::wait_idle) with a deadline. Returns `true` if idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.queue.is_empty() || state.active > 0 {
            if self
                .shared
                .idle
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.queue.is_empty() && state.active == 0;
            }
        }
        true
    }

    /// Stop accepting jobs, let workers drain the queue and join them.
    ///
    /// Safe to call from inside a job; the calling worker is not joined.
    pub fn shutdown(&self) {
        self.signal_shutdown();

        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!(pool = %self.shared.name, "Worker thread panicked during shutdown");
            }
        }
        debug!(pool = %self.shared.name, "Worker pool stopped");
    }

    fn signal_shutdown(&self) {
        let mut state = self.shared.state.lock();
        state.shutdown = true;
        drop(state);
        self.shared.work_ready.notify_all();
    }

    fn spawn_workers(&self, state: &mut PoolState, count: usize) {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());

        for _ in 0..count {
            let id = state.next_worker_id;
            state.next_worker_id += 1;

            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-worker-{}", self.shared.name, id))
                .spawn(move || worker_loop(shared));

            match spawned {
                Ok(handle) => {
                    state.live += 1;
                    handles.push(handle);
                }
                Err(e) => {
                    error!(pool = %self.shared.name, error = %e, "Failed to spawn worker thread");
                }
            }
        }
    }
}

impl Drop for JobPool {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

impl std::fmt::Debug for JobPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("JobPool")
            .field("name", &self.shared.name)
            .field("size", &state.target)
            .field("live", &state.live)
            .field("active", &state.active)
            .field("queued", &state.queue.len())
            .finish()
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if state.live > state.target {
                    state.live -= 1;
                    trace!(pool = %shared.name, "Surplus worker exiting");
                    return;
                }
                if let Some(job) = state.queue.pop_front() {
                    state.active += 1;
                    break job;
                }
                if state.shutdown {
                    state.live -= 1;
                    return;
                }
                shared.work_ready.wait(&mut state);
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(pool = %shared.name, "Job panicked");
        }

        let mut state = shared.state.lock();
        state.active -= 1;
        if state.queue.is_empty() && state.active == 0 {
            shared.idle.notify_all();
        }
    }
}
