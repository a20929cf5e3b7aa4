//! The delayed-publish scheduler: a small priority queue of deadlines
//! served by a handful of named worker threads, woken by a condition
//! variable rather than polling.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::error;
use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send>;

struct ScheduledTask {
    deadline: Instant,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    job: Mutex<Option<Job>>,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    // Reversed so `BinaryHeap`, a max-heap, surfaces the earliest deadline
    // first instead of the latest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Handle to a scheduled delayed publish. Dropping it does not cancel the
/// task; call [`TaskHandle::cancel`] explicitly.
#[derive(Clone)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    /// A handle for work that already ran synchronously; `cancel` is a
    /// no-op and `is_cancelled` always reports `true` since there is
    /// nothing left to fire.
    pub(crate) fn already_fired() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::SeqCst)
    }
}

struct SchedulerState {
    heap: Mutex<BinaryHeap<ScheduledTask>>,
    condvar: Condvar,
    shutdown: AtomicBool,
    seq: AtomicU64,
}

pub(crate) struct DelayedScheduler {
    state: Arc<SchedulerState>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DelayedScheduler {
    pub(crate) fn new(core_workers: usize, thread_name_prefix: &str) -> Self {
        let state = Arc::new(SchedulerState {
            heap: Mutex::new(BinaryHeap::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
            seq: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(core_workers);
        for idx in 0..core_workers.max(1) {
            let state = state.clone();
            let name = format!("{}{}", thread_name_prefix, idx);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(state, name))
                .expect("failed to spawn delayed-scheduler worker thread");
            workers.push(handle);
        }

        Self {
            state,
            workers: Mutex::new(workers),
        }
    }

    pub(crate) fn schedule(&self, delay: Duration, job: impl FnOnce() + Send + 'static) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let seq = self.state.seq.fetch_add(1, AtomicOrdering::SeqCst);
        let task = ScheduledTask {
            deadline: Instant::now() + delay,
            seq,
            cancelled: cancelled.clone(),
            job: Mutex::new(Some(Box::new(job))),
        };

        {
            let mut heap = self.state.heap.lock();
            heap.push(task);
        }
        // A newly scheduled task may have an earlier deadline than whatever
        // a worker is currently sleeping on, so wake everyone to re-check.
        self.state.condvar.notify_all();

        TaskHandle { cancelled }
    }

    pub(crate) fn shutdown(&self, grace: Duration) {
        self.state.shutdown.store(true, AtomicOrdering::SeqCst);
        self.state.condvar.notify_all();

        let deadline = Instant::now() + grace;
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        while Instant::now() < deadline && handles.iter().any(|h| !h.is_finished()) {
            thread::sleep(Duration::from_millis(20));
        }
        for handle in handles {
            if handle.is_finished() {
                let _ = handle.join();
            }
            // Otherwise detach: Rust has no safe way to force a thread to
            // stop, so a worker still mid-job past the grace window is left
            // to finish on its own.
        }
    }
}

fn worker_loop(state: Arc<SchedulerState>, name: String) {
    loop {
        let task = {
            let mut heap = state.heap.lock();
            loop {
                if state.shutdown.load(AtomicOrdering::SeqCst) {
                    return;
                }
                match heap.peek() {
                    None => {
                        state.condvar.wait(&mut heap);
                    }
                    Some(task) => {
                        let now = Instant::now();
                        if task.deadline <= now {
                            break;
                        }
                        state.condvar.wait_for(&mut heap, task.deadline - now);
                    }
                }
            }
            heap.pop().expect("heap peeked non-empty above")
        };

        if task.cancelled.load(AtomicOrdering::SeqCst) {
            continue;
        }
        let Some(job) = task.job.lock().take() else {
            continue;
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
            error!("delayed-scheduler worker `{}` task panicked: {}", name, panic_message(&panic));
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
