//! # Executor
//!
//! Batch execution for sinks.
//!
//! Responsible for:
//! - Driving `prepare` / `execute` and classifying the outcome ([`SinkExecutor`])
//! - Running one sink per worker behind a bounded queue ([`WorkerHandle`])
//! - Spreading batches over workers round-robin ([`WorkerPool`])

pub mod error;
pub mod executor;
pub mod handle;
pub mod metrics;
pub mod pool;
pub mod sinks;

#[cfg(test)]
mod test_support;

pub use contracts::{Record, Sink};
pub use error::ExecutorError;
pub use executor::SinkExecutor;
pub use handle::{FailedBatch, WorkerHandle};
pub use metrics::{WorkerMetrics, WorkerMetricsSnapshot};
pub use pool::{create_worker_pool, WorkerPool};
pub use sinks::{create_sink, FileSink, FileSinkConfig, LogSink};
