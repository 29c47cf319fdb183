//! SinkExecutor - batch execution template
//!
//! One batch moves through `Preparing -> Executing -> Reporting -> Done`.
//! Structural failures (deserialization, I/O) escape to the caller; every
//! other failure collapses the batch to "all failed" and is reported
//! through instrumentation.

use std::sync::Arc;
use std::time::Instant;

use contracts::{Instrumentation, Record, Sink, SinkError, TelemetryError};
use tracing::{debug, error, info, instrument, warn, Span};

/// Phase of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchPhase {
    Preparing,
    Executing,
    Reporting,
    Done,
}

impl BatchPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Executing => "executing",
            Self::Reporting => "reporting",
            Self::Done => "done",
        }
    }

    fn enter(self) {
        Span::current().record("phase", self.as_str());
    }
}

/// Stateless execution template shared by every worker
#[derive(Clone)]
pub struct SinkExecutor {
    instrumentation: Arc<dyn Instrumentation>,
}

impl SinkExecutor {
    pub fn new(instrumentation: Arc<dyn Instrumentation>) -> Self {
        Self { instrumentation }
    }

    pub fn instrumentation(&self) -> &Arc<dyn Instrumentation> {
        &self.instrumentation
    }

    /// Push one batch through `sink`
    ///
    /// Returns the failed records: the subset `execute` declared, or the
    /// whole batch when preparation or execution failed.
    ///
    /// # Errors
    /// Only structural failures ([`SinkError::is_structural`]) are returned.
    #[instrument(
        name = "sink_push_batch",
        skip(self, sink, records),
        fields(
            sink_type = %sink.sink_type(),
            batch_size = records.len(),
            phase = tracing::field::Empty
        )
    )]
    pub fn push_batch<S: Sink + ?Sized>(
        &self,
        sink: &mut S,
        records: &[Record],
    ) -> Result<Vec<Record>, SinkError> {
        if records.is_empty() {
            debug!("Empty batch, nothing to push");
            return Ok(Vec::new());
        }

        let sink_type = sink.sink_type().to_string();
        let started = Instant::now();

        BatchPhase::Preparing.enter();
        if let Err(err) = sink.prepare(records) {
            if err.is_structural() {
                error!(error = %err, "Structural failure while preparing batch");
                return Err(err);
            }
            return Ok(self.fail_batch(&sink_type, &err, records, started));
        }

        self.emit("lifetime", self.instrumentation.lifetime(&sink_type, records));
        self.emit("execution_started", self.instrumentation.execution_started());
        info!("pushing {} messages", records.len());

        BatchPhase::Executing.enter();
        let started = Instant::now();
        match sink.execute(records) {
            Ok(failed) => {
                BatchPhase::Reporting.enter();
                self.emit(
                    "execution_succeeded",
                    self.instrumentation
                        .execution_succeeded(&sink_type, records, started.elapsed()),
                );
                if !failed.is_empty() {
                    warn!(failed = failed.len(), "Batch executed with failed records");
                }
                BatchPhase::Done.enter();
                Ok(failed)
            }
            Err(err) if err.is_structural() => {
                error!(error = %err, "Structural failure while executing batch");
                Err(err)
            }
            Err(err) => Ok(self.fail_batch(&sink_type, &err, records, started)),
        }
    }

    fn fail_batch(
        &self,
        sink_type: &str,
        err: &SinkError,
        records: &[Record],
        started: Instant,
    ) -> Vec<Record> {
        BatchPhase::Reporting.enter();
        warn!(error = %err, kind = err.kind(), "Batch failed, returning all records");
        self.emit(
            "execution_failed",
            self.instrumentation
                .execution_failed(sink_type, err, records, started.elapsed()),
        );
        BatchPhase::Done.enter();
        records.to_vec()
    }

    fn emit(&self, event: &'static str, result: Result<(), TelemetryError>) {
        if let Err(e) = result {
            warn!(event, error = %e, "Telemetry emission failed");
        }
    }
}

impl std::fmt::Debug for SinkExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkExecutor").finish_non_exhaustive()
    }
}
