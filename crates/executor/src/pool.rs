//! WorkerPool - round-robin distribution of batches over sink workers

use std::sync::Arc;

use contracts::{Instrumentation, Record, Sink, SinkRuntimeConfig};
use resolver::FieldTemplateResolver;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::error::ExecutorError;
use crate::executor::SinkExecutor;
use crate::handle::{FailedBatch, WorkerHandle};
use crate::metrics::{WorkerMetrics, WorkerMetricsSnapshot};
use crate::sinks::create_sink;

/// Pool of workers, each owning one sink instance
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    next: usize,
}

impl WorkerPool {
    /// Spawn `workers` workers, building each sink with `factory`
    ///
    /// Returns the pool and the receiver of failed-record reports.
    ///
    /// # Errors
    /// The first sink creation failure; workers spawned so far are stopped.
    pub async fn spawn<S, F>(
        workers: usize,
        queue_capacity: usize,
        executor: Arc<SinkExecutor>,
        mut factory: F,
    ) -> Result<(Self, mpsc::UnboundedReceiver<FailedBatch>), ExecutorError>
    where
        S: Sink + 'static,
        F: FnMut(usize) -> Result<S, ExecutorError>,
    {
        let (failed_tx, failed_rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers.max(1) {
            let sink = match factory(id) {
                Ok(sink) => sink,
                Err(e) => {
                    Self::shutdown_handles(handles).await;
                    return Err(e);
                }
            };
            handles.push(WorkerHandle::spawn(
                id,
                sink,
                Arc::clone(&executor),
                queue_capacity,
                failed_tx.clone(),
            ));
        }

        info!(workers = handles.len(), queue_capacity, "Worker pool started");
        Ok((
            Self {
                workers: handles,
                next: 0,
            },
            failed_rx,
        ))
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    fn next_worker(&mut self) -> &WorkerHandle {
        let index = self.next % self.workers.len();
        self.next = self.next.wrapping_add(1);
        &self.workers[index]
    }

    /// Queue a batch on the next worker without waiting
    ///
    /// A full queue drops the batch (counted, and reported as failed).
    ///
    /// # Errors
    /// [`ExecutorError::QueueFull`] or [`ExecutorError::WorkerClosed`]
    pub fn try_submit(&mut self, batch: Vec<Record>) -> Result<(), ExecutorError> {
        self.next_worker().try_send(batch)
    }

    /// Queue a batch on the next worker, waiting for capacity
    ///
    /// # Errors
    /// [`ExecutorError::WorkerClosed`] if that worker has stopped
    pub async fn submit(&mut self, batch: Vec<Record>) -> Result<(), ExecutorError> {
        self.next_worker().send(batch).await
    }

    /// Counters per worker
    pub fn metrics(&self) -> Vec<(usize, WorkerMetricsSnapshot)> {
        self.workers
            .iter()
            .map(|w| (w.id(), w.metrics().snapshot()))
            .collect()
    }

    /// Live counter handles, readable after [`WorkerPool::shutdown`]
    pub fn worker_metrics(&self) -> Vec<(usize, Arc<WorkerMetrics>)> {
        self.workers
            .iter()
            .map(|w| (w.id(), Arc::clone(w.metrics())))
            .collect()
    }

    /// Counters summed over all workers
    pub fn total_metrics(&self) -> WorkerMetricsSnapshot {
        self.workers
            .iter()
            .map(|w| w.metrics().snapshot())
            .fold(WorkerMetricsSnapshot::default(), |acc, s| acc + s)
    }

    /// Stop every worker after its queue drains
    ///
    /// # Errors
    /// The first structural failure (or panic) among the workers.
    #[instrument(name = "worker_pool_shutdown", skip(self), fields(workers = self.workers.len()))]
    pub async fn shutdown(self) -> Result<(), ExecutorError> {
        let mut first_error = None;
        for handle in self.workers {
            if let Err(e) = handle.shutdown().await {
                error!(error = %e, "Worker stopped with error");
                first_error.get_or_insert(e);
            }
        }
        info!("Worker pool shutdown complete");
        first_error.map_or(Ok(()), Err)
    }

    async fn shutdown_handles(handles: Vec<WorkerHandle>) {
        for handle in handles {
            let worker = handle.id();
            if let Err(e) = handle.shutdown().await {
                warn!(worker, error = %e, "Worker stopped with error during spawn rollback");
            }
        }
    }
}

/// Build a worker pool from runtime configuration
///
/// Every worker gets its own sink built from `config.sink`, sharing the
/// resolver and instrumentation.
#[instrument(
    name = "worker_pool_create",
    skip(config, resolver, instrumentation),
    fields(sink = %config.sink.name, sink_type = config.sink.sink_type.as_str())
)]
pub async fn create_worker_pool(
    config: &SinkRuntimeConfig,
    resolver: FieldTemplateResolver,
    instrumentation: Arc<dyn Instrumentation>,
) -> Result<(WorkerPool, mpsc::UnboundedReceiver<FailedBatch>), ExecutorError> {
    let executor = Arc::new(SinkExecutor::new(instrumentation));
    WorkerPool::spawn(
        config.worker.workers,
        config.worker.queue_capacity,
        executor,
        |_| create_sink(&config.sink, resolver.clone()),
    )
    .await
}
