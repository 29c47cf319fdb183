//! SinkRuntimeConfig - Config Loader output
//!
//! Describes the complete runtime configuration: schema source, sink,
//! destination template, worker pool and telemetry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use validator::Validate;

use crate::ResolutionMode;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkRuntimeConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Schema descriptor source
    #[validate(nested)]
    pub schema: SchemaConfig,

    /// Sink definition
    #[validate(nested)]
    pub sink: SinkConfig,

    /// Worker pool settings
    #[serde(default)]
    #[validate(nested)]
    pub worker: WorkerConfig,

    /// Telemetry settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Schema descriptor source
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SchemaConfig {
    /// Path to a serialized FileDescriptorSet
    pub descriptor_set: PathBuf,

    /// Fully qualified message type of record values
    #[validate(length(min = 1))]
    pub message_type: String,

    /// Fully qualified message type of record keys (defaults to `message_type`)
    #[serde(default)]
    pub key_message_type: Option<String>,
}

impl SchemaConfig {
    /// Message type decoded for the given resolution mode
    pub fn message_type_for(&self, mode: ResolutionMode) -> &str {
        match mode {
            ResolutionMode::Key => self.key_message_type.as_deref().unwrap_or(&self.message_type),
            ResolutionMode::Message => &self.message_type,
        }
    }
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Destination template (`"<literal-with-%-directives>,<idx_1>,...,<idx_k>"`)
    #[serde(default)]
    pub service_url: Option<String>,

    /// Which half of the record feeds the template
    #[serde(default)]
    pub parameter_source: ResolutionMode,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// File output
    File,
}

impl SinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::File => "file",
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkerConfig {
    /// Number of workers, each owning one sink instance
    #[serde(default = "default_workers")]
    #[validate(range(min = 1))]
    pub workers: usize,

    /// Per-worker batch queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Maximum records per batch
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    100
}

fn default_batch_size() -> usize {
    100
}

/// Telemetry settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Labels attached to every emitted metric
    #[serde(default)]
    pub global_tags: BTreeMap<String, String>,
}
