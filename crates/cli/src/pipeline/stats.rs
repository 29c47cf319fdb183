//! Pipeline statistics.

use std::time::Duration;

use executor::WorkerMetricsSnapshot;
use observability::ExecutionSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Input lines read
    pub lines_read: u64,

    /// Lines skipped because they did not parse or decode
    pub rejected_lines: u64,

    /// Records handed to the worker pool
    pub records_submitted: u64,

    /// Batches handed to the worker pool
    pub batches_submitted: u64,

    /// Records reported back as not delivered
    pub records_failed: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Per-worker counters
    pub workers: Vec<(usize, WorkerMetricsSnapshot)>,

    /// Telemetry aggregated by the instrumentation
    pub execution: ExecutionSummary,

    /// Structural failure that stopped a worker, if any
    pub structural_failure: Option<String>,
}

impl PipelineStats {
    /// Records per second handed to the pool
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_submitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Lines read: {}", self.lines_read);
        println!("   ├─ Rejected lines: {}", self.rejected_lines);
        println!("   ├─ Records submitted: {}", self.records_submitted);
        println!("   ├─ Batches submitted: {}", self.batches_submitted);
        println!("   ├─ Records failed: {}", self.records_failed);
        println!("   └─ Throughput: {:.2} records/s", self.throughput());

        if !self.workers.is_empty() {
            println!("\nWorkers");
            for (id, metrics) in &self.workers {
                println!(
                    "   ├─ #{id}: {} batches, {} records, {} failed, {} dropped, {} lost, {} structural",
                    metrics.batch_count,
                    metrics.record_count,
                    metrics.failed_count,
                    metrics.dropped_count,
                    metrics.lost_count,
                    metrics.structural_count
                );
            }
        }

        println!("\n{}", self.execution);

        if let Some(ref failure) = self.structural_failure {
            println!("Structural failure: {failure}");
        }
        println!();
    }
}
