//! Mock sink and instrumentation shared by unit tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{Instrumentation, Record, Sink, SinkError, TelemetryError};

pub(crate) fn records(n: i64) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new(format!("k{i}"), format!("v{i}"), 0, i).with_topic("test"))
        .collect()
}

/// Sink whose outcome is scripted per test
#[derive(Default)]
pub(crate) struct MockSink {
    pub fail_offsets: Vec<i64>,
    pub prepare_error: Option<fn() -> SinkError>,
    pub execute_error: Option<fn() -> SinkError>,
    pub delay: Duration,
    pub prepared: usize,
    pub executed: usize,
    pub closed: Arc<AtomicBool>,
}

impl MockSink {
    pub fn failing_offsets(offsets: impl IntoIterator<Item = i64>) -> Self {
        Self {
            fail_offsets: offsets.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl Sink for MockSink {
    fn sink_type(&self) -> &str {
        "mock"
    }

    fn prepare(&mut self, _records: &[Record]) -> Result<(), SinkError> {
        self.prepared += 1;
        match self.prepare_error {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }

    fn execute(&mut self, records: &[Record]) -> Result<Vec<Record>, SinkError> {
        self.executed += 1;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(make) = self.execute_error {
            return Err(make());
        }
        Ok(records
            .iter()
            .filter(|r| self.fail_offsets.contains(&r.offset()))
            .cloned()
            .collect())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Instrumentation recording events as short strings
#[derive(Default)]
pub(crate) struct RecordingInstrumentation {
    events: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingInstrumentation {
    /// Records nothing and fails every emission
    pub fn failing() -> Self {
        Self {
            events: Mutex::default(),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) -> Result<(), TelemetryError> {
        if self.fail {
            return Err(TelemetryError::new("collector unavailable"));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl Instrumentation for RecordingInstrumentation {
    fn lifetime(&self, _sink_type: &str, records: &[Record]) -> Result<(), TelemetryError> {
        self.push(format!("lifetime:{}", records.len()))
    }

    fn execution_started(&self) -> Result<(), TelemetryError> {
        self.push("started".to_string())
    }

    fn execution_succeeded(
        &self,
        _sink_type: &str,
        records: &[Record],
        _response_time: Duration,
    ) -> Result<(), TelemetryError> {
        self.push(format!("succeeded:{}", records.len()))
    }

    fn execution_failed(
        &self,
        _sink_type: &str,
        error: &SinkError,
        records: &[Record],
        _response_time: Duration,
    ) -> Result<(), TelemetryError> {
        self.push(format!("failed:{}:{}", error.kind(), records.len()))
    }
}
