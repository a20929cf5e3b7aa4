//! Fixed-size thread pool backing the async dispatcher and, via
//! [`crate::async_bus::AsyncEventBus`], the delayed scheduler's downstream
//! dispatch. This is the subject matter itself rather than ambient
//! plumbing, so it is hand-rolled on `crossbeam_channel` rather than
//! imported from a general-purpose pool crate.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Sender};
use log::error;
use parking_lot::Mutex;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
}

impl WorkerPool {
    pub(crate) fn new(workers: usize, thread_name_prefix: &str) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers.max(1) {
            let receiver = receiver.clone();
            let name = format!("{}{}", thread_name_prefix, idx);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
                            error!("worker `{}` panicked: {}", name, panic_message(&panic));
                        }
                    }
                })
                .expect("failed to spawn event bus worker thread");
            handles.push(handle);
        }

        Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            shutdown: AtomicBool::new(false),
        }
    }

    pub(crate) fn submit(&self, job: impl FnOnce() + Send + 'static) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(Box::new(job));
        }
    }

    /// Stops accepting new work, lets queued jobs drain, and waits up to
    /// `grace` for workers to finish. Workers still running past the grace
    /// window are detached rather than force-killed.
    pub(crate) fn shutdown(&self, grace: Duration) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.sender.lock().take();

        let deadline = Instant::now() + grace;
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        while Instant::now() < deadline && handles.iter().any(|h| !h.is_finished()) {
            thread::sleep(Duration::from_millis(20));
        }
        for handle in handles {
            if handle.is_finished() {
                let _ = handle.join();
            }
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
