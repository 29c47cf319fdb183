//! Resolver error types

use std::num::ParseIntError;

use contracts::SchemaError;
use thiserror::Error;

/// Template resolution errors
///
/// Local to one record's destination; callers surface them as a delivery
/// failure for that record.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Template is empty or structurally malformed
    #[error("Service URL '{template}' is invalid")]
    InvalidTemplate {
        template: String,
        reason: &'static str,
    },

    /// Template holds nothing but separators
    #[error("Empty Service URL configuration: '{template}'")]
    EmptyTemplateConfiguration { template: String },

    /// A trailing token is not a non-negative integer
    #[error("Invalid Proto Index")]
    InvalidFieldIndex {
        token: String,
        #[source]
        source: ParseIntError,
    },

    /// The decoded message has no field with this number
    #[error("Descriptor not found for index: {index}")]
    FieldNotFound { index: u32 },

    /// The selected bytes could not be decoded against the schema
    #[error("Unable to parse Service URL")]
    UndecodableMessage {
        #[source]
        source: SchemaError,
    },

    /// The field value cannot be coerced to the directive's type class
    #[error("field {index} of type {kind} cannot be formatted with '{specifier}'")]
    IncompatibleField {
        index: u32,
        specifier: String,
        kind: &'static str,
    },
}

impl ResolveError {
    pub(crate) fn invalid_template(template: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason,
        }
    }
}
