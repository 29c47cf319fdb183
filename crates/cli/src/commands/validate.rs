//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ResolutionMode, SinkRuntimeConfig, SinkType};
use resolver::Template;
use schema::ProtoSchemaProvider;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sink: String,
    sink_type: String,
    message_type: String,
    service_url: Option<String>,
    placeholders: usize,
    workers: usize,
    batch_size: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    let invalid = |error: String| ValidationResult {
        valid: false,
        config_path: config_path.clone(),
        error: Some(error),
        warnings: None,
        summary: None,
    };

    // Check file exists
    if !args.config.exists() {
        return invalid(format!("File not found: {}", args.config.display()));
    }

    // Try to load and validate
    let runtime = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(runtime) => runtime,
        Err(e) => return invalid(e.to_string()),
    };
    if let Err(e) = check_schema(&runtime) {
        return invalid(e);
    }

    let warnings = collect_warnings(&runtime);
    let placeholders = runtime
        .sink
        .service_url
        .as_deref()
        .and_then(|url| Template::parse(url).ok())
        .map_or(0, |template| template.placeholders().count());

    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: if warnings.is_empty() {
            None
        } else {
            Some(warnings)
        },
        summary: Some(ConfigSummary {
            version: format!("{:?}", runtime.version),
            sink: runtime.sink.name.clone(),
            sink_type: runtime.sink.sink_type.as_str().to_string(),
            message_type: runtime.schema.message_type.clone(),
            service_url: runtime.sink.service_url.clone(),
            placeholders,
            workers: runtime.worker.workers,
            batch_size: runtime.worker.batch_size,
        }),
    }
}

/// The descriptor set must load and know the configured message types
fn check_schema(runtime: &SinkRuntimeConfig) -> Result<(), String> {
    let provider = ProtoSchemaProvider::from_file(&runtime.schema.descriptor_set)
        .map_err(|e| e.to_string())?;

    let mut types = vec![runtime.schema.message_type.as_str()];
    types.extend(runtime.schema.key_message_type.as_deref());
    match types
        .into_iter()
        .find(|name| provider.descriptor(name).is_none())
    {
        Some(name) => Err(format!("Unknown message type: {name}")),
        None => Ok(()),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(runtime: &SinkRuntimeConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let sink = &runtime.sink;

    match sink.service_url.as_deref().map(Template::parse) {
        None if sink.sink_type == SinkType::Log => {
            warnings.push("No service_url - records are logged under the sink name".to_string());
        }
        Some(Ok(template)) if template.is_static() => {
            warnings.push(format!(
                "service_url '{}' has no placeholders - every record goes to the same destination",
                template.raw()
            ));
        }
        _ => {}
    }

    if sink.parameter_source == ResolutionMode::Key && runtime.schema.key_message_type.is_none() {
        warnings.push(
            "parameter_source is 'key' but schema.key_message_type is unset - keys decode as message_type"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sink: {} ({})", summary.sink, summary.sink_type);
            println!("  Message type: {}", summary.message_type);
            if let Some(ref service_url) = summary.service_url {
                println!(
                    "  Service URL: {} ({} placeholders)",
                    service_url, summary.placeholders
                );
            }
            println!("  Workers: {}", summary.workers);
            println!("  Batch size: {}", summary.batch_size);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
