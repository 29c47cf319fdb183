//! ProtoSchemaProvider - descriptor pool backed schema provider

use std::path::Path;

use contracts::{ContractError, FieldTree, SchemaError, SchemaProvider};
use dashmap::DashMap;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use tracing::{debug, info};

use crate::convert::to_field_tree;

/// Schema provider over a protobuf descriptor pool
///
/// Descriptors are cached by name after the first lookup; the cache is
/// safe for concurrent readers across workers.
#[derive(Debug)]
pub struct ProtoSchemaProvider {
    pool: DescriptorPool,
    cache: DashMap<String, MessageDescriptor>,
}

impl ProtoSchemaProvider {
    /// Wrap an existing descriptor pool
    pub fn from_pool(pool: DescriptorPool) -> Self {
        Self {
            pool,
            cache: DashMap::new(),
        }
    }

    /// Load from serialized `FileDescriptorSet` bytes
    ///
    /// # Errors
    /// Returns [`ContractError::DescriptorLoad`] if the bytes are not a valid descriptor set
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContractError> {
        let pool = DescriptorPool::decode(bytes)
            .map_err(|e| ContractError::descriptor_load(format!("invalid descriptor set: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Load from a descriptor set file (`protoc --descriptor_set_out`)
    ///
    /// # Errors
    /// - File read failure
    /// - Invalid descriptor set
    pub fn from_file(path: &Path) -> Result<Self, ContractError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ContractError::descriptor_load(format!(
                "failed to read descriptor file '{}': {e}",
                path.display()
            ))
        })?;
        let provider = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            messages = provider.pool.all_messages().len(),
            "Descriptor set loaded"
        );
        Ok(provider)
    }

    /// Resolve a message descriptor by fully qualified name
    pub fn descriptor(&self, message_type: &str) -> Option<MessageDescriptor> {
        if let Some(descriptor) = self.cache.get(message_type) {
            return Some(descriptor.clone());
        }
        let descriptor = self.pool.get_message_by_name(message_type)?;
        self.cache
            .insert(message_type.to_string(), descriptor.clone());
        debug!(message_type, "Descriptor cached");
        Some(descriptor)
    }

    /// All message type names known to the pool
    pub fn message_types(&self) -> Vec<String> {
        self.pool
            .all_messages()
            .map(|m| m.full_name().to_string())
            .collect()
    }
}

impl SchemaProvider for ProtoSchemaProvider {
    fn decode(&self, bytes: &[u8], message_type: &str) -> Result<FieldTree, SchemaError> {
        let descriptor =
            self.descriptor(message_type)
                .ok_or_else(|| SchemaError::UnknownMessageType {
                    name: message_type.to_string(),
                })?;
        let message = DynamicMessage::decode(descriptor, bytes)
            .map_err(|e| SchemaError::decode(message_type, e.to_string()))?;
        Ok(to_field_tree(&message))
    }

    fn contains(&self, message_type: &str) -> bool {
        self.descriptor(message_type).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use contracts::FieldValue;
    use std::sync::Arc;

    #[test]
    fn test_decode_by_field_number() {
        let provider = fixtures::provider();
        let bytes = fixtures::booking_message("bookingOrderNumber", 12.3, 2000);

        let tree = provider.decode(&bytes, fixtures::BOOKING_MESSAGE).unwrap();
        assert_eq!(
            tree.get(1),
            Some(&FieldValue::Str("bookingOrderNumber".into()))
        );
        assert_eq!(tree.get(16), Some(&FieldValue::Float(12.3)));
        assert_eq!(tree.get(52), Some(&FieldValue::Int(2000)));
    }

    #[test]
    fn test_unknown_message_type() {
        let provider = fixtures::provider();
        let err = provider.decode(&[], "sink.test.Missing").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownMessageType { .. }));
        assert!(!provider.contains("sink.test.Missing"));
        assert!(provider.contains(fixtures::TEST_KEY));
    }

    #[test]
    fn test_corrupt_bytes() {
        let provider = fixtures::provider();
        let err = provider
            .decode(fixtures::CORRUPT_BYTES, fixtures::TEST_MESSAGE)
            .unwrap_err();
        assert!(matches!(err, SchemaError::Decode { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descriptors.bin");
        std::fs::write(&path, fixtures::descriptor_set_bytes()).unwrap();

        let provider = ProtoSchemaProvider::from_file(&path).unwrap();
        let types = provider.message_types();
        assert!(types.contains(&fixtures::TEST_MESSAGE.to_string()));
        assert!(types.contains(&fixtures::BOOKING_MESSAGE.to_string()));
    }

    #[test]
    fn test_from_invalid_bytes() {
        let err = ProtoSchemaProvider::from_bytes(b"not a descriptor set").unwrap_err();
        assert!(matches!(err, ContractError::DescriptorLoad { .. }));
    }

    #[test]
    fn test_concurrent_readers() {
        let provider = Arc::new(fixtures::provider());
        let bytes = fixtures::test_key("ORDER-1-FROM-KEY");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let provider = Arc::clone(&provider);
                let bytes = bytes.clone();
                std::thread::spawn(move || provider.decode(&bytes, fixtures::TEST_KEY).unwrap())
            })
            .collect();

        for handle in handles {
            let tree = handle.join().unwrap();
            assert_eq!(
                tree.get(1),
                Some(&FieldValue::Str("ORDER-1-FROM-KEY".into()))
            );
        }
    }
}
