//! `resolve` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{Record, ResolutionMode};
use resolver::FieldTemplateResolver;
use schema::ProtoSchemaProvider;
use tracing::{debug, info};

use crate::cli::ResolveArgs;
use crate::pipeline::decode_base64;

/// Execute the `resolve` command, printing the destination to stdout
pub fn run_resolve(args: &ResolveArgs) -> Result<()> {
    let runtime = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let template = args
        .template
        .clone()
        .or_else(|| runtime.sink.service_url.clone())
        .context("No template given and sink.service_url is unset")?;
    let mode: ResolutionMode = args
        .mode
        .map_or(runtime.sink.parameter_source, Into::into);

    let provider = ProtoSchemaProvider::from_file(&runtime.schema.descriptor_set)
        .with_context(|| {
            format!(
                "Failed to load descriptor set {}",
                runtime.schema.descriptor_set.display()
            )
        })?;
    let resolver = FieldTemplateResolver::from_config(Arc::new(provider), &runtime.schema);

    let record = Record::new(
        decode_base64(&args.key).context("Invalid base64 key")?,
        decode_base64(&args.value).context("Invalid base64 value")?,
        0,
        0,
    );
    debug!(
        template = %template,
        mode = %mode,
        message_type = resolver.message_type_for(mode),
        "Resolving template"
    );

    let destination = resolver
        .resolve(&record, &template, mode)
        .with_context(|| format!("Failed to resolve '{template}'"))?;

    info!(destination = %destination, "Template resolved");
    println!("{destination}");
    Ok(())
}
