//! Layered error definitions
//!
//! Categorized by source: config / schema / sink / telemetry

use thiserror::Error;

/// Configuration and setup errors
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Schema Errors =====
    /// Descriptor set could not be loaded
    #[error("descriptor load error: {message}")]
    DescriptorLoad { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create descriptor load error
    pub fn descriptor_load(message: impl Into<String>) -> Self {
        Self::DescriptorLoad {
            message: message.into(),
        }
    }
}

/// Schema provider errors
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No descriptor registered under the requested name
    #[error("message type '{name}' not found in descriptor pool")]
    UnknownMessageType { name: String },

    /// Bytes are corrupt or incompatible with the descriptor
    #[error("failed to decode '{message_type}': {message}")]
    Decode {
        message_type: String,
        message: String,
    },
}

impl SchemaError {
    pub fn decode(message_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            message_type: message_type.into(),
            message: message.into(),
        }
    }
}

/// Errors crossing the sink boundary (`prepare` / `execute`)
///
/// `Deserialization` and `Io` are structural: the pipeline itself is
/// misconfigured and batch processing must stop. Everything else is a
/// delivery failure that collapses the batch to "all failed".
#[derive(Debug, Error)]
pub enum SinkError {
    /// Payload could not be deserialized
    #[error("deserialization error: {message}")]
    Deserialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO / connectivity error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence layer (database) error
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// Backend rejected or failed the delivery
    #[error("sink '{sink_type}' delivery error: {message}")]
    Delivery { sink_type: String, message: String },
}

impl SinkError {
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
            source: None,
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn delivery(sink_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            sink_type: sink_type.into(),
            message: message.into(),
        }
    }

    /// Structural failures propagate out of the execution template
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Deserialization { .. } | Self::Io(_))
    }

    /// Stable label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deserialization { .. } => "deserialization",
            Self::Io(_) => "io",
            Self::Persistence { .. } => "persistence",
            Self::Delivery { .. } => "delivery",
        }
    }
}

/// Telemetry emission failure
#[derive(Debug, Error)]
#[error("telemetry error: {message}")]
pub struct TelemetryError {
    pub message: String,
}

impl TelemetryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        assert!(SinkError::deserialization("bad proto").is_structural());
        assert!(SinkError::from(std::io::Error::other("conn reset")).is_structural());
        assert!(!SinkError::persistence("deadlock").is_structural());
        assert!(!SinkError::delivery("http", "503").is_structural());
    }

    #[test]
    fn test_error_messages() {
        let err = SinkError::delivery("http", "503 Service Unavailable");
        assert_eq!(
            err.to_string(),
            "sink 'http' delivery error: 503 Service Unavailable"
        );
        let err = ContractError::config_validation("sink.name", "cannot be empty");
        assert_eq!(
            err.to_string(),
            "config validation error at 'sink.name': cannot be empty"
        );
    }
}
