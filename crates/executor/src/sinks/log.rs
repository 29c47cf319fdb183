//! LogSink - logs each record with its destination via tracing

use contracts::{Record, ResolutionMode, Sink, SinkError};
use resolver::{FieldTemplateResolver, ResolveError, Template};
use tracing::{info, instrument, warn};

/// Sink that logs record summaries for debugging
pub struct LogSink {
    name: String,
    resolver: FieldTemplateResolver,
    template: Option<Template>,
    mode: ResolutionMode,
    staged: Vec<Result<String, ResolveError>>,
}

impl LogSink {
    /// Create a LogSink whose destination is its own name
    pub fn new(name: impl Into<String>, resolver: FieldTemplateResolver) -> Self {
        Self {
            name: name.into(),
            resolver,
            template: None,
            mode: ResolutionMode::default(),
            staged: Vec::new(),
        }
    }

    /// Resolve a destination per record from `template`
    pub fn with_template(mut self, template: Template, mode: ResolutionMode) -> Self {
        self.template = Some(template);
        self.mode = mode;
        self
    }
}

impl Sink for LogSink {
    fn sink_type(&self) -> &str {
        "log"
    }

    #[instrument(
        name = "log_sink_prepare",
        skip(self, records),
        fields(sink = %self.name, records = records.len())
    )]
    fn prepare(&mut self, records: &[Record]) -> Result<(), SinkError> {
        let staged = match &self.template {
            Some(template) => records
                .iter()
                .map(|record| self.resolver.resolve_template(record, template, self.mode))
                .collect(),
            None => records.iter().map(|_| Ok(self.name.clone())).collect(),
        };
        self.staged = staged;
        Ok(())
    }

    #[instrument(
        name = "log_sink_execute",
        skip(self, records),
        fields(sink = %self.name, records = records.len())
    )]
    fn execute(&mut self, records: &[Record]) -> Result<Vec<Record>, SinkError> {
        if self.staged.len() != records.len() {
            return Err(SinkError::delivery("log", "batch was not prepared"));
        }

        let mut failed = Vec::new();
        for (record, destination) in records.iter().zip(std::mem::take(&mut self.staged)) {
            match destination {
                Ok(destination) => info!(
                    sink = %self.name,
                    destination = %destination,
                    topic = record.topic(),
                    partition = record.partition(),
                    offset = record.offset(),
                    bytes = record.value().len(),
                    "Record delivered"
                ),
                Err(e) => {
                    warn!(
                        sink = %self.name,
                        partition = record.partition(),
                        offset = record.offset(),
                        error = %e,
                        "Destination unresolved"
                    );
                    failed.push(record.clone());
                }
            }
        }
        Ok(failed)
    }

    #[instrument(name = "log_sink_close", skip(self))]
    fn close(&mut self) -> Result<(), SinkError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
