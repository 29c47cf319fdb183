//! Instrumentation trait - telemetry reporting interface
//!
//! Narrow reporting capability injected into the execution template. The
//! encoding and transport of events belong to the implementation.

use std::time::Duration;

use crate::{Record, SinkError, TelemetryError};

/// Telemetry collaborator
///
/// Emission is fire-and-forget for callers: an `Err` is logged and never
/// changes the outcome of a batch.
pub trait Instrumentation: Send + Sync {
    /// Time elapsed since each record was produced
    fn lifetime(&self, sink_type: &str, records: &[Record]) -> Result<(), TelemetryError>;

    /// A batch is about to be executed
    fn execution_started(&self) -> Result<(), TelemetryError>;

    /// `execute` returned normally for the whole batch
    fn execution_succeeded(
        &self,
        sink_type: &str,
        records: &[Record],
        response_time: Duration,
    ) -> Result<(), TelemetryError>;

    /// Preparation or execution failed; the whole batch is reported failed
    fn execution_failed(
        &self,
        sink_type: &str,
        error: &SinkError,
        records: &[Record],
        response_time: Duration,
    ) -> Result<(), TelemetryError>;
}
