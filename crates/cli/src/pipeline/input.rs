//! NDJSON record format shared by `run` input and failed-record output.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use contracts::Record;
use serde::{Deserialize, Serialize};

/// One broker record per line; key and value are base64
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub partition: i32,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub timestamp_ms: i64,
}

impl InputRecord {
    /// Parse one NDJSON line
    pub fn parse_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("invalid record line")
    }

    /// Decode into a [`Record`]
    pub fn into_record(self) -> Result<Record> {
        let key = match &self.key {
            Some(key) => decode_base64(key).context("invalid base64 key")?,
            None => Vec::new(),
        };
        let value = decode_base64(&self.value).context("invalid base64 value")?;

        Ok(Record::new(key, value, self.partition, self.offset)
            .with_topic(self.topic)
            .with_timestamp_ms(self.timestamp_ms))
    }

    /// Encode a record for the failed-record output
    pub fn from_record(record: &Record) -> Self {
        Self {
            key: (!record.key().is_empty()).then(|| STANDARD.encode(record.key())),
            value: STANDARD.encode(record.value()),
            topic: record.topic().to_string(),
            partition: record.partition(),
            offset: record.offset(),
            timestamp_ms: record.timestamp_ms(),
        }
    }
}

pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(input.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_line() {
        let input = InputRecord::parse_line(r#"{"value": "aGVsbG8="}"#).unwrap();
        let record = input.into_record().unwrap();
        assert_eq!(record.value().as_ref(), b"hello");
        assert!(record.key().is_empty());
        assert_eq!(record.partition(), 0);
        assert_eq!(record.timestamp_ms(), 0);
    }

    #[test]
    fn test_parse_full_line() {
        let line = r#"{"key":"a2V5","value":"dmFsdWU=","topic":"orders","partition":3,"offset":42,"timestamp_ms":1700000000000}"#;
        let record = InputRecord::parse_line(line)
            .unwrap()
            .into_record()
            .unwrap();
        assert_eq!(record.key().as_ref(), b"key");
        assert_eq!(record.topic(), "orders");
        assert_eq!(record.partition(), 3);
        assert_eq!(record.offset(), 42);
        assert_eq!(record.timestamp_ms(), 1_700_000_000_000);
    }

    #[test]
    fn test_failed_output_keeps_coordinates() {
        let record = Record::new(b"k".to_vec(), b"v".to_vec(), 2, 7).with_topic("orders");
        let encoded = InputRecord::from_record(&record);
        assert_eq!(encoded.into_record().unwrap(), record);

        let keyless = InputRecord::from_record(&Record::new(Vec::<u8>::new(), b"v".to_vec(), 0, 1));
        let json = serde_json::to_string(&keyless).unwrap();
        assert!(!json.contains("\"key\""));
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert!(InputRecord::parse_line("not json").is_err());
        assert!(InputRecord::parse_line(r#"{"topic": "orders"}"#).is_err());

        let bad_value = InputRecord::parse_line(r#"{"value": "***"}"#).unwrap();
        assert!(bad_value.into_record().is_err());
    }
}
