use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use job_logging::{job_debug, job_error};
use thiserror::Error;

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    ZeroSize,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
    #[error("worker pool is shut down")]
    Closed,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    active: AtomicUsize,
}

/// Fixed set of worker threads fed from one FIFO queue.
///
/// A task waits in the queue until a worker is free; a panicking task is
/// caught and logged, and its worker moves on to the next task. Dropping the
/// pool closes the queue, lets queued tasks drain and joins every worker.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroSize);
        }

        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = Arc::clone(&receiver);
            let counters = Arc::clone(&counters);
            let handle = thread::Builder::new()
                .name(format!("caption-worker-{index}"))
                .spawn(move || worker_loop(index, &receiver, &counters))?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
            counters,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::Closed)?;
        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        if sender.send(Box::new(task)).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(PoolError::Closed);
        }
        Ok(())
    }

    /// Tasks waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::SeqCst)
    }

    /// Tasks currently executing.
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }
}

fn worker_loop(index: usize, receiver: &Mutex<mpsc::Receiver<Task>>, counters: &Counters) {
    loop {
        let task = {
            let receiver = receiver.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.recv()
        };
        let Ok(task) = task else {
            break;
        };

        counters.queued.fetch_sub(1, Ordering::SeqCst);
        counters.active.fetch_add(1, Ordering::SeqCst);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            job_error!(
                "worker {} recovered from panicking task: {}",
                index,
                panic_message(&*payload)
            );
        }
        counters.active.fetch_sub(1, Ordering::SeqCst);
    }
    job_debug!("worker {} stopped", index);
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
