//! Record - broker collaborator output
//!
//! One key/value unit consumed from the upstream broker.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ResolutionMode;

/// Broker record
///
/// Immutable once constructed. Key and value are opaque bytes (zero-copy);
/// the schema provider gives them structure on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    key: Bytes,
    value: Bytes,
    #[serde(default)]
    topic: String,
    partition: i32,
    offset: i64,
    /// Production time (epoch millis), 0 when unknown
    #[serde(default)]
    timestamp_ms: i64,
}

impl Record {
    /// Create a record from its key, value and source coordinates
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>, partition: i32, offset: i64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            topic: String::new(),
            partition,
            offset,
            timestamp_ms: 0,
        }
    }

    /// Set the source topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the production timestamp (epoch millis)
    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Bytes selected by the resolution mode
    pub fn payload(&self, mode: ResolutionMode) -> &Bytes {
        match mode {
            ResolutionMode::Key => &self.key,
            ResolutionMode::Message => &self.value,
        }
    }

    /// Time elapsed between production and `now`
    ///
    /// Returns `None` when the record carries no timestamp. Clock skew that
    /// places production in the future yields zero.
    pub fn lifetime_at(&self, now: SystemTime) -> Option<Duration> {
        if self.timestamp_ms <= 0 {
            return None;
        }
        let produced = UNIX_EPOCH + Duration::from_millis(self.timestamp_ms as u64);
        Some(now.duration_since(produced).unwrap_or(Duration::ZERO))
    }
}
