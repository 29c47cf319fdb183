//! Pipeline orchestrator - reads records, batches them and feeds the worker pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{Record, SinkRuntimeConfig};
use executor::{create_worker_pool, FailedBatch, WorkerPool};
use observability::MetricsInstrumentation;
use resolver::FieldTemplateResolver;
use schema::ProtoSchemaProvider;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{InputRecord, PipelineStats};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated runtime configuration
    pub runtime: SinkRuntimeConfig,

    /// NDJSON input ("-" for stdin)
    pub input: PathBuf,

    /// NDJSON output for undelivered records (None = log only)
    pub failed_output: Option<PathBuf>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the input is exhausted
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let runtime = &self.config.runtime;

        // Schema & resolver
        let descriptor_set = &runtime.schema.descriptor_set;
        let provider = ProtoSchemaProvider::from_file(descriptor_set).with_context(|| {
            format!("Failed to load descriptor set {}", descriptor_set.display())
        })?;
        let resolver = FieldTemplateResolver::from_config(Arc::new(provider), &runtime.schema);

        // Worker pool
        let instrumentation = Arc::new(MetricsInstrumentation::new(
            &runtime.telemetry.global_tags,
        ));
        let (mut pool, failed_rx) =
            create_worker_pool(runtime, resolver, instrumentation.clone())
                .await
                .context("Failed to start worker pool")?;
        let worker_metrics = pool.worker_metrics();

        info!(
            sink = %runtime.sink.name,
            sink_type = runtime.sink.sink_type.as_str(),
            workers = pool.len(),
            batch_size = runtime.worker.batch_size,
            "Worker pool ready"
        );

        let collector = tokio::spawn(collect_failed(
            failed_rx,
            self.config.failed_output.clone(),
        ));

        let mut stats = PipelineStats::default();
        let feed_result = match open_input(&self.config.input).await {
            Ok(reader) => {
                self.feed(reader, &mut pool, runtime.worker.batch_size, &mut stats)
                    .await
            }
            Err(e) => Err(e),
        };

        // Shutdown: queues drain before workers stop
        info!("Shutting down worker pool...");
        if let Err(e) = pool.shutdown().await {
            warn!(error = %e, "Worker pool stopped on structural failure");
            stats.structural_failure = Some(e.to_string());
        }
        stats.records_failed = collector
            .await
            .context("Failed-record collector panicked")??;
        feed_result?;

        stats.workers = worker_metrics
            .iter()
            .map(|(id, metrics)| (*id, metrics.snapshot()))
            .collect();
        stats.execution = instrumentation.summary();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            records = stats.records_submitted,
            failed = stats.records_failed,
            "Pipeline finished"
        );

        Ok(stats)
    }

    /// Read lines, batch them and submit to the pool
    async fn feed<R: AsyncBufRead + Unpin>(
        &self,
        reader: R,
        pool: &mut WorkerPool,
        batch_size: usize,
        stats: &mut PipelineStats,
    ) -> Result<()> {
        let mut lines = reader.lines();
        let mut batch: Vec<Record> = Vec::with_capacity(batch_size);

        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            if line.trim().is_empty() {
                continue;
            }
            stats.lines_read += 1;

            match InputRecord::parse_line(&line).and_then(InputRecord::into_record) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    warn!(line = stats.lines_read, error = %e, "Skipping input line");
                    stats.rejected_lines += 1;
                    continue;
                }
            }

            if batch.len() >= batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                if !submit(pool, full, stats).await {
                    return Ok(());
                }
            }
        }

        if !batch.is_empty() {
            submit(pool, batch, stats).await;
        }
        Ok(())
    }
}

/// Submit one batch; false once a worker has stopped
async fn submit(pool: &mut WorkerPool, batch: Vec<Record>, stats: &mut PipelineStats) -> bool {
    let records = batch.len() as u64;
    match pool.submit(batch).await {
        Ok(()) => {
            stats.batches_submitted += 1;
            stats.records_submitted += records;
            true
        }
        Err(e) => {
            // the batch was handed back on the failed channel
            warn!(error = %e, "Worker stopped, no further input is read");
            false
        }
    }
}

async fn open_input(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open input {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Drain failed-record reports until every worker has stopped
///
/// Returns the number of records reported.
async fn collect_failed(
    mut failed_rx: mpsc::UnboundedReceiver<FailedBatch>,
    output: Option<PathBuf>,
) -> Result<u64> {
    let mut writer = match &output {
        Some(path) => Some(
            File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => None,
    };

    let mut count = 0u64;
    while let Some(FailedBatch { worker, records }) = failed_rx.recv().await {
        debug!(worker, records = records.len(), "Records not delivered");
        count += records.len() as u64;

        if let Some(file) = writer.as_mut() {
            for record in &records {
                let mut line = serde_json::to_vec(&InputRecord::from_record(record))?;
                line.push(b'\n');
                file.write_all(&line).await?;
            }
        }
    }

    if let Some(mut file) = writer {
        file.flush().await?;
    }
    if count > 0 && output.is_none() {
        warn!(records = count, "Undelivered records discarded, no failed output configured");
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use contracts::{
        ConfigVersion, ResolutionMode, SchemaConfig, SinkConfig, SinkType, TelemetryConfig,
        WorkerConfig,
    };
    use schema::fixtures;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn runtime(dir: &Path, service_url: &str) -> SinkRuntimeConfig {
        let descriptor_set = dir.join("descriptors.bin");
        std::fs::write(&descriptor_set, fixtures::descriptor_set_bytes()).unwrap();

        SinkRuntimeConfig {
            version: ConfigVersion::V1,
            schema: SchemaConfig {
                descriptor_set,
                message_type: fixtures::TEST_MESSAGE.into(),
                key_message_type: Some(fixtures::TEST_KEY.into()),
            },
            sink: SinkConfig {
                name: "orders".into(),
                sink_type: SinkType::File,
                service_url: Some(service_url.into()),
                parameter_source: ResolutionMode::Message,
                params: HashMap::from([(
                    "base_path".to_string(),
                    dir.join("out").display().to_string(),
                )]),
            },
            worker: WorkerConfig {
                workers: 2,
                queue_capacity: 4,
                batch_size: 2,
            },
            telemetry: TelemetryConfig::default(),
        }
    }

    fn input_line(order: &str, offset: i64) -> String {
        let line = serde_json::json!({
            "value": STANDARD.encode(fixtures::test_message(order, "DETAILS")),
            "topic": "orders",
            "partition": 0,
            "offset": offset,
        });
        line.to_string()
    }

    #[tokio::test]
    async fn test_run_writes_records_and_failures() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.ndjson");
        let failed = dir.path().join("failed.ndjson");

        let lines = [
            input_line("a", 0),
            input_line("b", 1),
            "garbage".to_string(),
            // undecodable value fails only this record
            serde_json::json!({ "value": STANDARD.encode(fixtures::CORRUPT_BYTES), "offset": 2 })
                .to_string(),
            input_line("a", 3),
        ];
        std::fs::write(&input, lines.join("\n")).unwrap();

        let pipeline = Pipeline::new(PipelineConfig {
            runtime: runtime(dir.path(), "%s.log,1"),
            input,
            failed_output: Some(failed.clone()),
        });
        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.rejected_lines, 1);
        assert_eq!(stats.records_submitted, 4);
        assert_eq!(stats.records_failed, 1);
        assert!(stats.structural_failure.is_none());

        let a = std::fs::read(dir.path().join("out/a.log")).unwrap();
        assert_eq!(a.len(), 2 * (fixtures::test_message("a", "DETAILS").len() + 1));
        assert!(dir.path().join("out/b.log").exists());

        let failed_lines = std::fs::read_to_string(&failed).unwrap();
        let record = InputRecord::parse_line(failed_lines.trim()).unwrap();
        assert_eq!(record.offset, 2);
    }

    #[tokio::test]
    async fn test_missing_descriptor_set() {
        let dir = tempdir().unwrap();
        let mut runtime = runtime(dir.path(), "%s.log,1");
        runtime.schema.descriptor_set = dir.path().join("missing.bin");

        let pipeline = Pipeline::new(PipelineConfig {
            runtime,
            input: dir.path().join("input.ndjson"),
            failed_output: None,
        });
        assert!(pipeline.run().await.is_err());
    }
}
