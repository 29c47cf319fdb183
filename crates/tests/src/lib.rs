//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 描述符 -> 解析器 -> worker 池 -> sink 的端到端测试
//! - 遥测摘要与失败记录回传

#[cfg(test)]
mod contract_tests {
    use contracts::{ResolutionMode, SinkError};

    #[test]
    fn test_resolution_mode_parse() {
        assert_eq!("key".parse::<ResolutionMode>().unwrap(), ResolutionMode::Key);
        assert_eq!(
            "message".parse::<ResolutionMode>().unwrap(),
            ResolutionMode::Message
        );
        assert!("value".parse::<ResolutionMode>().is_err());
    }

    #[test]
    fn test_structural_classification() {
        assert!(SinkError::deserialization("bad schema").is_structural());
        assert!(SinkError::from(std::io::Error::other("disk")).is_structural());
        assert!(!SinkError::delivery("http", "503").is_structural());
    }
}

#[cfg(test)]
mod resolver_tests {
    use std::sync::Arc;

    use contracts::{Record, ResolutionMode};
    use resolver::{FieldTemplateResolver, ResolveError};
    use schema::{fixtures, ProtoSchemaProvider};
    use tempfile::tempdir;

    /// Resolver over a descriptor set read back from disk
    fn resolver() -> FieldTemplateResolver {
        let dir = tempdir().unwrap();
        let path = dir.path().join("descriptors.bin");
        std::fs::write(&path, fixtures::descriptor_set_bytes()).unwrap();

        let provider = ProtoSchemaProvider::from_file(&path).unwrap();
        FieldTemplateResolver::new(Arc::new(provider), fixtures::BOOKING_MESSAGE)
            .with_key_message_type(fixtures::TEST_KEY)
    }

    #[test]
    fn test_booking_destinations() {
        let resolver = resolver();
        let record = fixtures::booking_record();

        let cases = [
            ("http://dummyurl.com/%s,1", "http://dummyurl.com/bookingOrderNumber"),
            ("http://dummyurl.com/%.2f,16", "http://dummyurl.com/12.30"),
            ("http://dummyurl.com/%d?fare,52", "http://dummyurl.com/2000?fare"),
            (
                "http://dummyurl.com/%s/%05d, 1 ,52",
                "http://dummyurl.com/bookingOrderNumber/02000",
            ),
            ("http://dummyurl.com/static", "http://dummyurl.com/static"),
        ];
        for (template, expected) in cases {
            assert_eq!(
                resolver
                    .resolve(&record, template, ResolutionMode::Message)
                    .unwrap(),
                expected,
                "{template}"
            );
        }
    }

    #[test]
    fn test_key_mode_reads_key_bytes() {
        let resolver = resolver();
        let destination = resolver
            .resolve(
                &fixtures::booking_record(),
                "http://dummyurl.com/%s,1",
                ResolutionMode::Key,
            )
            .unwrap();
        assert_eq!(destination, "http://dummyurl.com/ORDER-1-FROM-KEY");
    }

    #[test]
    fn test_error_messages() {
        let resolver = resolver();
        let record = fixtures::booking_record();
        let corrupt = Record::new(fixtures::CORRUPT_BYTES, fixtures::CORRUPT_BYTES, 0, 0);

        let cases: [(&Record, &str, &str); 4] = [
            (&record, "", "Service URL '' is invalid"),
            (&record, ",,,", "Empty Service URL configuration: ',,,'"),
            (&record, "%s, 6a", "Invalid Proto Index"),
            (&corrupt, "%s,1", "Unable to parse Service URL"),
        ];
        for (record, template, message) in cases {
            let err = resolver
                .resolve(record, template, ResolutionMode::Message)
                .unwrap_err();
            assert_eq!(err.to_string(), message, "{template}");
        }

        let err = resolver
            .resolve(&record, "%s,1000", ResolutionMode::Message)
            .unwrap_err();
        assert!(matches!(err, ResolveError::FieldNotFound { index: 1000 }));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;

    use config_loader::ConfigLoader;
    use contracts::{Instrumentation, Record, Sink, SinkError};
    use executor::{create_worker_pool, FailedBatch, SinkExecutor, WorkerPool};
    use observability::MetricsInstrumentation;
    use resolver::FieldTemplateResolver;
    use schema::{fixtures, ProtoSchemaProvider};
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn write_config(dir: &Path) -> std::path::PathBuf {
        std::fs::write(
            dir.join("descriptors.bin"),
            fixtures::descriptor_set_bytes(),
        )
        .unwrap();

        let content = format!(
            r#"
[schema]
descriptor_set = "descriptors.bin"
message_type = "{message}"
key_message_type = "{key}"

[sink]
name = "orders"
sink_type = "file"
service_url = "orders/%s.log,1"

[sink.params]
base_path = "{base}"

[worker]
workers = 3
queue_capacity = 8
batch_size = 4

[telemetry.global_tags]
env = "test"
"#,
            message = fixtures::TEST_MESSAGE,
            key = fixtures::TEST_KEY,
            base = dir.join("out").display(),
        );
        let path = dir.join("sink.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn order(order_number: &str, offset: i64) -> Record {
        Record::new(
            fixtures::test_key("KEY"),
            fixtures::test_message(order_number, "DETAILS"),
            0,
            offset,
        )
        .with_topic("orders")
    }

    async fn drain(mut failed_rx: mpsc::UnboundedReceiver<FailedBatch>) -> Vec<Record> {
        let mut failed = Vec::new();
        while let Some(batch) = failed_rx.recv().await {
            failed.extend(batch.records);
        }
        failed
    }

    /// End-to-end: config file -> descriptor set -> resolver -> worker pool -> FileSink
    #[tokio::test]
    async fn test_e2e_file_sink_pipeline() {
        let dir = tempdir().unwrap();
        let config = ConfigLoader::load_from_path(&write_config(dir.path())).unwrap();

        let provider = ProtoSchemaProvider::from_file(&config.schema.descriptor_set).unwrap();
        let resolver = FieldTemplateResolver::from_config(Arc::new(provider), &config.schema);
        let instrumentation = Arc::new(MetricsInstrumentation::new(
            &config.telemetry.global_tags,
        ));

        let (mut pool, failed_rx) =
            create_worker_pool(&config, resolver, instrumentation.clone())
                .await
                .unwrap();
        assert_eq!(pool.len(), 3);

        let corrupt = Record::new(Vec::<u8>::new(), fixtures::CORRUPT_BYTES, 0, 99);
        let mut records: Vec<Record> = (0..11)
            .map(|i| order(if i % 2 == 0 { "even" } else { "odd" }, i))
            .collect();
        records.push(corrupt.clone());

        let mut batches = 0u64;
        for chunk in records.chunks(config.worker.batch_size) {
            pool.submit(chunk.to_vec()).await.unwrap();
            batches += 1;
        }
        let totals = pool.worker_metrics();
        pool.shutdown().await.unwrap();

        assert_eq!(drain(failed_rx).await, vec![corrupt]);

        let value_len = fixtures::test_message("even", "DETAILS").len() + 1;
        let even = std::fs::read(dir.path().join("out/orders/even.log")).unwrap();
        let odd = std::fs::read(dir.path().join("out/orders/odd.log")).unwrap();
        assert_eq!(even.len(), 6 * value_len);
        assert_eq!(odd.len(), 5 * value_len);

        let recorded: u64 = totals
            .iter()
            .map(|(_, metrics)| metrics.record_count())
            .sum();
        assert_eq!(recorded, 12);

        let summary = instrumentation.summary();
        assert_eq!(summary.executions_started, batches);
        assert_eq!(summary.succeeded_batches, batches);
        assert_eq!(summary.messages_succeeded, 12);
        assert_eq!(summary.failed_batches, 0);
    }

    /// Sink whose delivery always fails with the given error
    struct RejectingSink {
        error: fn() -> SinkError,
        fail_in_prepare: bool,
    }

    impl Sink for RejectingSink {
        fn sink_type(&self) -> &str {
            "rejecting"
        }

        fn prepare(&mut self, _records: &[Record]) -> Result<(), SinkError> {
            if self.fail_in_prepare {
                return Err((self.error)());
            }
            Ok(())
        }

        fn execute(&mut self, _records: &[Record]) -> Result<Vec<Record>, SinkError> {
            Err((self.error)())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    async fn rejecting_pool(
        error: fn() -> SinkError,
        fail_in_prepare: bool,
        instrumentation: Arc<dyn Instrumentation>,
    ) -> (WorkerPool, mpsc::UnboundedReceiver<FailedBatch>) {
        let executor = Arc::new(SinkExecutor::new(instrumentation));
        WorkerPool::spawn(2, 4, executor, |_| {
            Ok(RejectingSink {
                error,
                fail_in_prepare,
            })
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_delivery_failure_returns_whole_batch() {
        let instrumentation = Arc::new(MetricsInstrumentation::default());
        let (mut pool, failed_rx) = rejecting_pool(
            || SinkError::delivery("rejecting", "503 Service Unavailable"),
            false,
            instrumentation.clone(),
        )
        .await;

        let batch: Vec<Record> = (0..3).map(|i| order("x", i)).collect();
        pool.submit(batch.clone()).await.unwrap();
        pool.submit(batch.clone()).await.unwrap();
        pool.shutdown().await.unwrap();

        assert_eq!(drain(failed_rx).await.len(), 6);

        let summary = instrumentation.summary();
        assert_eq!(summary.executions_started, 2);
        assert_eq!(summary.failed_batches, 2);
        assert_eq!(summary.messages_failed, 6);
        assert_eq!(summary.errors.get("delivery"), Some(&2));
    }

    #[tokio::test]
    async fn test_structural_failure_stops_pool() {
        let instrumentation = Arc::new(MetricsInstrumentation::default());
        let (mut pool, failed_rx) = rejecting_pool(
            || SinkError::from(std::io::Error::other("connection reset")),
            true,
            instrumentation.clone(),
        )
        .await;

        pool.submit(vec![order("x", 0)]).await.unwrap();
        let err = pool.shutdown().await.unwrap_err();
        assert!(matches!(err, executor::ExecutorError::Structural { .. }));

        assert_eq!(drain(failed_rx).await.len(), 1);

        // structural failures bypass telemetry
        let summary = instrumentation.summary();
        assert_eq!(summary.executions_started, 0);
        assert_eq!(summary.failed_batches, 0);
    }
}
