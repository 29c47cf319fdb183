//! Executor error types

use contracts::SinkError;
use thiserror::Error;

/// Worker pool errors
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Worker queue is full, batch dropped
    #[error("queue full for worker {worker}, batch of {records} records dropped")]
    QueueFull { worker: usize, records: usize },

    /// Worker queue is closed (worker stopped)
    #[error("worker {worker} is not accepting batches")]
    WorkerClosed { worker: usize },

    /// A structural sink failure stopped a worker
    #[error("worker {worker} stopped on structural failure: {source}")]
    Structural {
        worker: usize,
        #[source]
        source: SinkError,
    },

    /// Worker thread panicked
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },
}

impl ExecutorError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
