//! SchemaProvider trait - schema descriptor capability
//!
//! Resolves a logical message type name to a descriptor and decodes bytes
//! against it. Implementations own and cache descriptors; the runtime only
//! reads from them, possibly from several workers at once.

use crate::{FieldTree, SchemaError};

/// Schema descriptor provider
pub trait SchemaProvider: Send + Sync {
    /// Decode `bytes` as an instance of `message_type`
    ///
    /// # Errors
    /// - [`SchemaError::UnknownMessageType`] if no descriptor is registered
    /// - [`SchemaError::Decode`] if the bytes are corrupt or incompatible
    fn decode(&self, bytes: &[u8], message_type: &str) -> Result<FieldTree, SchemaError>;

    /// Whether a descriptor exists for `message_type`
    fn contains(&self, message_type: &str) -> bool;
}

impl<P: SchemaProvider + ?Sized> SchemaProvider for std::sync::Arc<P> {
    fn decode(&self, bytes: &[u8], message_type: &str) -> Result<FieldTree, SchemaError> {
        (**self).decode(bytes, message_type)
    }

    fn contains(&self, message_type: &str) -> bool {
        (**self).contains(message_type)
    }
}
