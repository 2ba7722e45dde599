//! Worker pool execution
//!
//! A dispatcher feeds task ids into a bounded work queue, a fixed set of
//! workers turns ids into digests and pushes them into a bounded result
//! queue, a join-waiter closes the result queue once every worker has
//! exited, and the collector folds digests in whatever order they arrive.
//!
//! Workers run on blocking threads so the CPU-bound hashing never stalls
//! the async tasks (dispatcher, join-waiter, collector) that drive the pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::bench::aggregate::Sink;
use crate::bench::workload::{run_task, Digest, TaskId};
use crate::{BenchError, Result};

/// Queue slots per worker, applied to both the work and the result queue
pub const QUEUE_SLOTS_PER_WORKER: usize = 2;

type WorkQueue = Arc<Mutex<mpsc::Receiver<TaskId>>>;

/// What a worker did before it observed end-of-work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker index within the pool
    pub id: usize,
    /// Number of tasks this worker computed
    pub processed: u64,
}

/// Counts pool units that are still alive
#[derive(Debug, Clone, Default)]
struct UnitTracker {
    live: Arc<AtomicUsize>,
}

impl UnitTracker {
    fn enter(&self) -> UnitGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        UnitGuard {
            live: Arc::clone(&self.live),
        }
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct UnitGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for UnitGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed-size worker pool executor
#[derive(Debug)]
pub struct PooledExecutor {
    block_size: usize,
    worker_count: usize,
    units: UnitTracker,
}

impl PooledExecutor {
    /// Create a pool of `worker_count` workers producing `block_size` byte blocks.
    ///
    /// The worker count is not corrected here; zero workers is rejected.
    pub fn new(block_size: usize, worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(BenchError::Config(
                "Worker count must be greater than 0 for pooled mode".to_string(),
            ));
        }

        Ok(Self {
            block_size,
            worker_count,
            units: UnitTracker::default(),
        })
    }

    /// Number of workers in the pool
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Size of each generated block in bytes
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Capacity of the work queue and of the result queue
    pub fn queue_capacity(&self) -> usize {
        self.worker_count.saturating_mul(QUEUE_SLOTS_PER_WORKER)
    }

    /// Workers, dispatchers and join-waiters currently alive for this executor
    pub fn live_units(&self) -> usize {
        self.units.live()
    }

    /// Execute tasks `0..task_count` across the pool and fold their digests.
    ///
    /// Returns only after every unit of the pool has exited, including on error.
    pub async fn run(&self, task_count: u64) -> Result<Sink> {
        let start = Instant::now();
        let capacity = self.queue_capacity();
        info!(
            task_count,
            block_size = self.block_size,
            workers = self.worker_count,
            queue_capacity = capacity,
            "Starting pooled run"
        );

        let (work_tx, work_rx) = mpsc::channel::<TaskId>(capacity);
        let (result_tx, mut result_rx) = mpsc::channel::<Digest>(capacity);
        let work_rx: WorkQueue = Arc::new(Mutex::new(work_rx));

        let workers: Vec<_> = (0..self.worker_count)
            .map(|id| self.spawn_worker(id, Arc::clone(&work_rx), result_tx.clone()))
            .collect();
        // Only workers keep the work queue open from here on
        drop(work_rx);

        let dispatcher = self.spawn_dispatcher(work_tx, task_count);
        let join_waiter = self.spawn_join_waiter(workers, result_tx);

        let mut sink = Sink::new();
        while let Some(digest) = result_rx.recv().await {
            sink.absorb(&digest);
        }

        let dispatched = join_result(dispatcher.await, "dispatcher");
        let reports = join_result(join_waiter.await, "join-waiter");
        let dispatched = dispatched?;
        let reports = reports?;

        let processed: u64 = reports.iter().map(|r| r.processed).sum();
        if dispatched != task_count || processed != task_count || sink.absorbed() != task_count {
            return Err(BenchError::Worker(format!(
                "incomplete run: dispatched {}, processed {}, collected {} of {} tasks",
                dispatched,
                processed,
                sink.absorbed(),
                task_count
            )));
        }

        info!(
            sink = sink.value(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pooled run finished"
        );
        Ok(sink)
    }

    /// Spawn a worker on the blocking pool
    fn spawn_worker(
        &self,
        id: usize,
        work_rx: WorkQueue,
        result_tx: mpsc::Sender<Digest>,
    ) -> JoinHandle<Result<WorkerReport>> {
        let guard = self.units.enter();
        let block_size = self.block_size;

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            worker_loop(id, &work_rx, &result_tx, block_size)
        })
    }

    /// Spawn the dispatcher that enqueues every task id in order
    fn spawn_dispatcher(
        &self,
        work_tx: mpsc::Sender<TaskId>,
        task_count: u64,
    ) -> JoinHandle<Result<u64>> {
        let guard = self.units.enter();

        tokio::spawn(async move {
            let _guard = guard;
            for id in 0..task_count {
                if work_tx.send(id).await.is_err() {
                    return Err(BenchError::Worker(format!(
                        "work queue closed after {} of {} tasks",
                        id, task_count
                    )));
                }
            }
            debug!(task_count, "Dispatcher signalled end of work");
            // Dropping the sender is the end-of-work signal
            Ok(task_count)
        })
    }

    /// Spawn the join-waiter that ends the result stream once all workers exit
    fn spawn_join_waiter(
        &self,
        workers: Vec<JoinHandle<Result<WorkerReport>>>,
        result_tx: mpsc::Sender<Digest>,
    ) -> JoinHandle<Result<Vec<WorkerReport>>> {
        let guard = self.units.enter();

        tokio::spawn(async move {
            let _guard = guard;
            let mut reports = Vec::with_capacity(workers.len());
            let mut first_error = None;

            for (id, handle) in workers.into_iter().enumerate() {
                match handle.await {
                    Ok(Ok(report)) => reports.push(report),
                    Ok(Err(e)) => {
                        warn!(worker_id = id, error = %e, "Worker failed");
                        first_error.get_or_insert(e);
                    }
                    Err(e) => {
                        warn!(worker_id = id, error = %e, "Worker terminated abnormally");
                        first_error.get_or_insert(BenchError::Worker(format!(
                            "worker {} terminated abnormally: {}",
                            id, e
                        )));
                    }
                }
            }

            // Last sender: the collector sees end-of-results once this drops
            drop(result_tx);
            debug!(workers = reports.len(), "All workers joined");

            match first_error {
                Some(e) => Err(e),
                None => Ok(reports),
            }
        })
    }
}

/// Body of one worker: take ids until end-of-work, push one digest per id
fn worker_loop(
    id: usize,
    work_rx: &Mutex<mpsc::Receiver<TaskId>>,
    result_tx: &mpsc::Sender<Digest>,
    block_size: usize,
) -> Result<WorkerReport> {
    debug!(worker_id = id, "Worker started");
    let mut processed = 0u64;

    loop {
        let next = {
            let mut queue = work_rx.lock().map_err(|_| {
                BenchError::Worker(format!("worker {}: work queue lock poisoned", id))
            })?;
            queue.blocking_recv()
        };
        let Some(task_id) = next else {
            break;
        };

        let digest = run_task(task_id, block_size);
        result_tx
            .blocking_send(digest)
            .map_err(|_| BenchError::Worker(format!("worker {}: result queue closed", id)))?;
        processed += 1;
    }

    debug!(worker_id = id, processed, "Worker observed end of work");
    Ok(WorkerReport { id, processed })
}

fn join_result<T>(joined: std::result::Result<Result<T>, JoinError>, unit: &str) -> Result<T> {
    joined.map_err(|e| BenchError::Worker(format!("{} terminated abnormally: {}", unit, e)))?
}
