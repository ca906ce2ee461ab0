//! Bounded worker pool
//!
//! Tasks go onto an unbounded queue and are pulled by at most `max_workers`
//! worker tasks. `submit` never blocks and never fails; `drain` closes the
//! queue and waits for every submitted task. A panicking task is counted and
//! does not take its worker (or any sibling) down with it.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default upper bound on concurrently running tasks
pub const DEFAULT_MAX_WORKERS: usize = 500;

type Job<T> = BoxFuture<'static, T>;
type SharedQueue<T> = Arc<AsyncMutex<mpsc::UnboundedReceiver<Job<T>>>>;

/// Everything the pool collected once drained
#[derive(Debug)]
pub struct PoolReport<T> {
    /// Output of every task that returned, in completion order
    pub outputs: Vec<T>,
    /// Tasks that panicked
    pub panicked: usize,
}

/// Fixed-concurrency executor for independent async tasks
pub struct WorkerPool<T> {
    max_workers: usize,
    sender: mpsc::UnboundedSender<Job<T>>,
    queue: SharedQueue<T>,
    workers: Vec<JoinHandle<()>>,
    outputs: Arc<Mutex<Vec<T>>>,
    panicked: Arc<AtomicUsize>,
    submitted: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Pool running at most `max_workers` tasks at once (minimum 1).
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(max_workers: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            max_workers: max_workers.max(1),
            sender,
            queue: Arc::new(AsyncMutex::new(receiver)),
            workers: Vec::new(),
            outputs: Arc::new(Mutex::new(Vec::new())),
            panicked: Arc::new(AtomicUsize::new(0)),
            submitted: 0,
        }
    }

    /// Maximum number of concurrently running tasks
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Tasks submitted so far
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Enqueue a task. Workers are started lazily, up to `max_workers`.
    pub fn submit<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        // The receiver lives in `self.queue`, so the channel cannot be closed here
        if self.sender.send(task.boxed()).is_err() {
            warn!("worker pool queue closed, dropping task");
            return;
        }
        self.submitted += 1;

        if self.workers.len() < self.max_workers {
            let worker = run_worker(
                self.workers.len(),
                self.queue.clone(),
                self.outputs.clone(),
                self.panicked.clone(),
            );
            self.workers.push(tokio::spawn(worker));
        }
    }

    /// Wait for every submitted task to finish and hand back their outputs.
    pub async fn drain(self) -> PoolReport<T> {
        let WorkerPool {
            sender,
            workers,
            outputs,
            panicked,
            submitted,
            ..
        } = self;

        // Closing the sender lets workers exit once the queue is empty
        drop(sender);
        debug!(submitted, workers = workers.len(), "draining worker pool");

        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "worker pool worker terminated abnormally");
            }
        }

        let outputs = std::mem::take(&mut *outputs.lock());
        PoolReport {
            outputs,
            panicked: panicked.load(Ordering::SeqCst),
        }
    }
}

async fn run_worker<T: Send + 'static>(
    id: usize,
    queue: SharedQueue<T>,
    outputs: Arc<Mutex<Vec<T>>>,
    panicked: Arc<AtomicUsize>,
) {
    loop {
        // Only one idle worker waits on the channel; the rest wait on the lock
        let job = queue.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        match AssertUnwindSafe(job).catch_unwind().await {
            Ok(output) => outputs.lock().push(output),
            Err(_) => {
                panicked.fetch_add(1, Ordering::SeqCst);
                warn!(worker = id, "worker pool task panicked");
            }
        }
    }
}
