//! # Schema
//!
//! Schema descriptor provider backed by protobuf descriptor sets.
//!
//! Responsibilities:
//! - Load a serialized `FileDescriptorSet`
//! - Cache message descriptors by fully qualified name
//! - Decode record bytes into a [`contracts::FieldTree`]

mod convert;
mod provider;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use contracts::{FieldTree, FieldValue, SchemaProvider};
pub use provider::ProtoSchemaProvider;
