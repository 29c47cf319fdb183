//! FieldTemplateResolver - record-driven destination resolution

use std::sync::Arc;

use contracts::{Record, ResolutionMode, SchemaConfig, SchemaProvider};
use tracing::{instrument, trace};

use crate::error::ResolveError;
use crate::template::Template;

/// Resolves destination templates against record payloads
///
/// Holds no mutable state; one instance is shared by every sink of a worker
/// pool. The schema provider is the only shared resource.
#[derive(Clone)]
pub struct FieldTemplateResolver {
    schema: Arc<dyn SchemaProvider>,
    message_type: String,
    key_message_type: Option<String>,
}

impl FieldTemplateResolver {
    /// Resolver decoding both halves as `message_type`
    pub fn new(schema: Arc<dyn SchemaProvider>, message_type: impl Into<String>) -> Self {
        Self {
            schema,
            message_type: message_type.into(),
            key_message_type: None,
        }
    }

    /// Decode keys as a different message type
    pub fn with_key_message_type(mut self, key_message_type: impl Into<String>) -> Self {
        self.key_message_type = Some(key_message_type.into());
        self
    }

    pub fn from_config(schema: Arc<dyn SchemaProvider>, config: &SchemaConfig) -> Self {
        Self {
            schema,
            message_type: config.message_type.clone(),
            key_message_type: config.key_message_type.clone(),
        }
    }

    /// Message type decoded for the given mode
    pub fn message_type_for(&self, mode: ResolutionMode) -> &str {
        match mode {
            ResolutionMode::Key => self
                .key_message_type
                .as_deref()
                .unwrap_or(&self.message_type),
            ResolutionMode::Message => &self.message_type,
        }
    }

    /// Parse `template` and resolve it against `record`
    ///
    /// # Errors
    /// Any [`ResolveError`]: template parse errors first, then decode and
    /// field errors.
    pub fn resolve(
        &self,
        record: &Record,
        template: &str,
        mode: ResolutionMode,
    ) -> Result<String, ResolveError> {
        let template = Template::parse(template)?;
        self.resolve_template(record, &template, mode)
    }

    /// Resolve a pre-parsed template against `record`
    ///
    /// Static templates are returned without decoding the record.
    #[instrument(
        name = "resolve_template",
        skip(self, record, template),
        fields(partition = record.partition(), offset = record.offset(), mode = %mode)
    )]
    pub fn resolve_template(
        &self,
        record: &Record,
        template: &Template,
        mode: ResolutionMode,
    ) -> Result<String, ResolveError> {
        if template.is_static() {
            return Ok(template.raw().to_string());
        }

        let tree = self
            .schema
            .decode(record.payload(mode), self.message_type_for(mode))
            .map_err(|source| ResolveError::UndecodableMessage { source })?;

        let destination = template.render(&tree)?;
        trace!(destination = %destination, "Template resolved");
        Ok(destination)
    }
}

impl std::fmt::Debug for FieldTemplateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldTemplateResolver")
            .field("message_type", &self.message_type)
            .field("key_message_type", &self.key_message_type)
            .finish_non_exhaustive()
    }
}
