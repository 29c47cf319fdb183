//! WorkerHandle - one sink behind an isolated queue and blocking worker

use std::sync::Arc;

use contracts::{Record, Sink, SinkError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::error::ExecutorError;
use crate::executor::SinkExecutor;
use crate::metrics::WorkerMetrics;

/// Records a worker could not deliver, handed back for retry/dead-lettering
#[derive(Debug, Clone, PartialEq)]
pub struct FailedBatch {
    pub worker: usize,
    pub records: Vec<Record>,
}

/// Handle to a running sink worker
pub struct WorkerHandle {
    id: usize,
    /// Channel to send batches to worker
    tx: mpsc::Sender<Vec<Record>>,
    /// Dropped batches are reported here too
    failed_tx: mpsc::UnboundedSender<FailedBatch>,
    metrics: Arc<WorkerMetrics>,
    worker_handle: JoinHandle<Result<(), SinkError>>,
}

impl WorkerHandle {
    /// Spawn a worker owning `sink` on the blocking pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: Sink + 'static>(
        id: usize,
        sink: S,
        executor: Arc<SinkExecutor>,
        queue_capacity: usize,
        failed_tx: mpsc::UnboundedSender<FailedBatch>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(WorkerMetrics::new());

        let worker = Worker {
            id,
            executor,
            metrics: Arc::clone(&metrics),
            failed_tx: failed_tx.clone(),
        };
        let worker_handle = tokio::task::spawn_blocking(move || worker.run(sink, rx));

        Self {
            id,
            tx,
            failed_tx,
            metrics,
            worker_handle,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn metrics(&self) -> &Arc<WorkerMetrics> {
        &self.metrics
    }

    /// Queue a batch without waiting
    ///
    /// A rejected batch is reported on the failed channel.
    ///
    /// # Errors
    /// - [`ExecutorError::QueueFull`]: the batch was dropped and counted
    /// - [`ExecutorError::WorkerClosed`]: the worker has stopped
    pub fn try_send(&self, batch: Vec<Record>) -> Result<(), ExecutorError> {
        match self.tx.try_send(batch) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(batch)) => {
                self.metrics.inc_dropped_count();
                let records = batch.len();
                warn!(worker = self.id, records, "Queue full, batch dropped");
                self.hand_back(batch);
                Err(ExecutorError::QueueFull {
                    worker: self.id,
                    records,
                })
            }
            Err(mpsc::error::TrySendError::Closed(batch)) => {
                error!(worker = self.id, "Worker closed unexpectedly");
                self.hand_back(batch);
                Err(ExecutorError::WorkerClosed { worker: self.id })
            }
        }
    }

    /// Queue a batch, waiting for capacity
    ///
    /// # Errors
    /// [`ExecutorError::WorkerClosed`] if the worker stopped; the batch is
    /// reported on the failed channel.
    pub async fn send(&self, batch: Vec<Record>) -> Result<(), ExecutorError> {
        match self.tx.send(batch).await {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                Ok(())
            }
            Err(mpsc::error::SendError(batch)) => {
                self.hand_back(batch);
                Err(ExecutorError::WorkerClosed { worker: self.id })
            }
        }
    }

    fn hand_back(&self, records: Vec<Record>) {
        if let Err(mpsc::error::SendError(batch)) = self.failed_tx.send(FailedBatch {
            worker: self.id,
            records,
        }) {
            let records = batch.records.len();
            self.metrics.add_lost(records);
            warn!(
                worker = self.id,
                records, "Failed-record receiver dropped, records discarded"
            );
        }
    }

    /// Drain the queue and stop the worker
    ///
    /// # Errors
    /// The structural failure that stopped the worker, if any.
    #[instrument(name = "worker_handle_shutdown", skip(self), fields(worker = self.id))]
    pub async fn shutdown(self) -> Result<(), ExecutorError> {
        // Drop sender to signal worker to stop
        drop(self.tx);
        let result = match self.worker_handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(ExecutorError::Structural {
                worker: self.id,
                source,
            }),
            Err(e) => Err(ExecutorError::WorkerPanicked {
                worker: self.id,
                message: e.to_string(),
            }),
        };
        debug!(worker = self.id, "WorkerHandle shutdown complete");
        result
    }
}

struct Worker {
    id: usize,
    executor: Arc<SinkExecutor>,
    metrics: Arc<WorkerMetrics>,
    failed_tx: mpsc::UnboundedSender<FailedBatch>,
}

impl Worker {
    /// Consume batches until the queue closes or a structural failure occurs
    #[instrument(name = "sink_worker_loop", skip(self, sink, rx), fields(worker = self.id))]
    fn run<S: Sink>(
        self,
        mut sink: S,
        mut rx: mpsc::Receiver<Vec<Record>>,
    ) -> Result<(), SinkError> {
        debug!(sink_type = sink.sink_type(), "Sink worker started");

        while let Some(batch) = rx.blocking_recv() {
            self.metrics.set_queue_len(rx.len());

            match self.executor.push_batch(&mut sink, &batch) {
                Ok(failed) => {
                    self.metrics.record_batch(batch.len(), failed.len());
                    if !failed.is_empty() {
                        self.report(failed);
                    }
                }
                Err(e) => {
                    self.metrics.inc_structural_count();
                    error!(error = %e, "Structural failure, stopping worker");

                    self.report(batch);
                    // nothing queued behind the failure gets delivered
                    rx.close();
                    while let Ok(pending) = rx.try_recv() {
                        self.report(pending);
                    }
                    self.close(&mut sink);
                    return Err(e);
                }
            }
        }

        self.close(&mut sink);
        debug!("Sink worker stopped");
        Ok(())
    }

    fn report(&self, records: Vec<Record>) {
        if let Err(mpsc::error::SendError(batch)) = self.failed_tx.send(FailedBatch {
            worker: self.id,
            records,
        }) {
            let records = batch.records.len();
            self.metrics.add_lost(records);
            warn!(records, "Failed-record receiver dropped, records discarded");
        }
    }

    fn close<S: Sink>(&self, sink: &mut S) {
        if let Err(e) = sink.close() {
            error!(error = %e, "Close failed on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{records, MockSink, RecordingInstrumentation};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn executor() -> Arc<SinkExecutor> {
        Arc::new(SinkExecutor::new(Arc::new(
            RecordingInstrumentation::default(),
        )))
    }

    #[tokio::test]
    async fn test_worker_reports_failed_records() {
        let (failed_tx, mut failed_rx) = mpsc::unbounded_channel();
        let sink = MockSink::failing_offsets([1]);
        let closed = Arc::clone(&sink.closed);

        let handle = WorkerHandle::spawn(0, sink, executor(), 10, failed_tx);
        for _ in 0..5 {
            handle.send(records(2)).await.unwrap();
        }
        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await.unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batch_count, 5);
        assert_eq!(snapshot.record_count, 10);
        assert_eq!(snapshot.failed_count, 5);
        assert!(closed.load(Ordering::SeqCst));

        let mut reported = 0;
        while let Ok(batch) = failed_rx.try_recv() {
            assert_eq!(batch.worker, 0);
            assert_eq!(batch.records.len(), 1);
            assert_eq!(batch.records[0].offset(), 1);
            reported += 1;
        }
        assert_eq!(reported, 5);
    }

    #[tokio::test]
    async fn test_queue_full_drops_batch() {
        let (failed_tx, mut failed_rx) = mpsc::unbounded_channel();
        let sink = MockSink {
            delay: Duration::from_millis(100),
            ..Default::default()
        };

        let handle = WorkerHandle::spawn(3, sink, executor(), 1, failed_tx);
        let accepted = (0..10)
            .filter(|_| handle.try_send(records(1)).is_ok())
            .count();
        assert!(accepted < 10);

        let dropped = handle.metrics().dropped_count();
        assert_eq!(dropped, (10 - accepted) as u64);
        handle.shutdown().await.unwrap();

        let mut handed_back = 0;
        while let Ok(batch) = failed_rx.try_recv() {
            assert_eq!(batch.worker, 3);
            handed_back += 1;
        }
        assert_eq!(handed_back, dropped);
    }

    #[tokio::test]
    async fn test_undeliverable_reports_are_counted() {
        let (failed_tx, failed_rx) = mpsc::unbounded_channel();
        drop(failed_rx);
        let sink = MockSink {
            delay: Duration::from_millis(100),
            ..MockSink::failing_offsets([0])
        };

        let handle = WorkerHandle::spawn(2, sink, executor(), 1, failed_tx);
        let accepted = (0..5)
            .filter(|_| handle.try_send(records(2)).is_ok())
            .count();
        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await.unwrap();

        let snapshot = metrics.snapshot();
        // dropped batches lose both records, delivered ones lose offset 0
        assert_eq!(
            snapshot.lost_count,
            snapshot.dropped_count * 2 + snapshot.failed_count
        );
        assert_eq!(snapshot.dropped_count, (5 - accepted) as u64);
        assert_eq!(snapshot.failed_count, accepted as u64);
    }

    #[tokio::test]
    async fn test_structural_failure_stops_worker() {
        let (failed_tx, mut failed_rx) = mpsc::unbounded_channel();
        let sink = MockSink {
            prepare_error: Some(|| SinkError::deserialization("schema mismatch")),
            ..Default::default()
        };
        let closed = Arc::clone(&sink.closed);

        let handle = WorkerHandle::spawn(1, sink, executor(), 10, failed_tx);
        handle.send(records(3)).await.unwrap();
        let metrics = Arc::clone(handle.metrics());

        let err = handle.shutdown().await.unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::Structural {
                worker: 1,
                source: SinkError::Deserialization { .. }
            }
        ));
        assert_eq!(metrics.structural_count(), 1);
        assert!(closed.load(Ordering::SeqCst));

        let batch = failed_rx.try_recv().unwrap();
        assert_eq!(batch.records.len(), 3);
    }
}
