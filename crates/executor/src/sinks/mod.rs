//! Reference sink implementations
//!
//! Contains LogSink and FileSink. Both resolve a destination per record in
//! `prepare`; a record whose destination cannot be resolved is returned as
//! failed by `execute`.

mod file;
mod log;

use contracts::{Sink, SinkConfig, SinkType};
use resolver::{FieldTemplateResolver, Template};
use tracing::instrument;

use crate::error::ExecutorError;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;

/// Create a sink from configuration
///
/// # Errors
/// [`ExecutorError::SinkCreation`] if the template does not parse or the
/// type-specific parameters are invalid.
#[instrument(
    name = "create_sink",
    skip(config, resolver),
    fields(sink = %config.name, sink_type = config.sink_type.as_str())
)]
pub fn create_sink(
    config: &SinkConfig,
    resolver: FieldTemplateResolver,
) -> Result<Box<dyn Sink>, ExecutorError> {
    let template = config
        .service_url
        .as_deref()
        .map(Template::parse)
        .transpose()
        .map_err(|e| ExecutorError::sink_creation(&config.name, e.to_string()))?;

    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name, resolver);
            Ok(Box::new(match template {
                Some(template) => sink.with_template(template, config.parameter_source),
                None => sink,
            }))
        }
        SinkType::File => {
            let template = template.ok_or_else(|| {
                ExecutorError::sink_creation(&config.name, "file sink requires a service_url")
            })?;
            let file_config = FileSinkConfig::from_params(&config.params)
                .map_err(|e| ExecutorError::sink_creation(&config.name, e))?;
            let sink = FileSink::new(
                &config.name,
                file_config,
                resolver,
                template,
                config.parameter_source,
            )
            .map_err(|e| ExecutorError::sink_creation(&config.name, e.to_string()))?;
            Ok(Box::new(sink))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ResolutionMode;
    use schema::fixtures;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn resolver() -> FieldTemplateResolver {
        FieldTemplateResolver::new(Arc::new(fixtures::provider()), fixtures::TEST_MESSAGE)
    }

    fn sink_config(sink_type: SinkType, service_url: Option<&str>) -> SinkConfig {
        SinkConfig {
            name: "orders".to_string(),
            sink_type,
            service_url: service_url.map(str::to_string),
            parameter_source: ResolutionMode::Message,
            params: HashMap::new(),
        }
    }

    #[test]
    fn test_create_log_sink() {
        let sink = create_sink(&sink_config(SinkType::Log, None), resolver()).unwrap();
        assert_eq!(sink.sink_type(), "log");

        let sink = create_sink(
            &sink_config(SinkType::Log, Some("http://host/%s,1")),
            resolver(),
        )
        .unwrap();
        assert_eq!(sink.sink_type(), "log");
    }

    #[test]
    fn test_invalid_template_rejected() {
        let err = create_sink(&sink_config(SinkType::Log, Some(",,,")), resolver())
            .err()
            .unwrap();
        assert!(matches!(err, ExecutorError::SinkCreation { .. }));
    }

    #[test]
    fn test_file_sink_requirements() {
        let err = create_sink(&sink_config(SinkType::File, None), resolver())
            .err()
            .unwrap();
        assert!(err.to_string().contains("service_url"));

        let err = create_sink(
            &sink_config(SinkType::File, Some("orders/%s.log,1")),
            resolver(),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("base_path"));

        let dir = tempfile::tempdir().unwrap();
        let mut config = sink_config(SinkType::File, Some("orders/%s.log,1"));
        config.params.insert(
            "base_path".to_string(),
            dir.path().display().to_string(),
        );
        let sink = create_sink(&config, resolver()).unwrap();
        assert_eq!(sink.sink_type(), "file");
    }
}
