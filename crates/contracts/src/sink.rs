//! Sink trait - delivery backend interface
//!
//! Defines the two extension points the execution template drives.

use crate::{Record, SinkError};

/// Delivery backend
///
/// All sink implementations must implement this trait. A batch is processed
/// synchronously: `prepare` then `execute`, both on the calling worker.
pub trait Sink: Send {
    /// Sink type (used for logging/metrics)
    fn sink_type(&self) -> &str;

    /// Stage a batch for delivery (compute destinations, build requests)
    ///
    /// # Errors
    /// [`SinkError::Deserialization`] and [`SinkError::Io`] halt the pipeline;
    /// any other error marks the whole batch failed.
    fn prepare(&mut self, records: &[Record]) -> Result<(), SinkError>;

    /// Deliver the staged batch
    ///
    /// Returns the records that failed; everything else is considered delivered.
    fn execute(&mut self, records: &[Record]) -> Result<Vec<Record>, SinkError>;

    /// Release backend resources
    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn sink_type(&self) -> &str {
        (**self).sink_type()
    }

    fn prepare(&mut self, records: &[Record]) -> Result<(), SinkError> {
        (**self).prepare(records)
    }

    fn execute(&mut self, records: &[Record]) -> Result<Vec<Record>, SinkError> {
        (**self).execute(records)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}
