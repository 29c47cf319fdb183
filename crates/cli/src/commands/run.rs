//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::SinkRuntimeConfig;
use observability::MetricsExporterConfig;
use tracing::{info, warn, Instrument};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut runtime = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(port) = args.metrics_port {
        info!(port, "Overriding metrics port from CLI");
        runtime.telemetry.metrics_port = (port != 0).then_some(port);
    }

    info!(
        sink = %runtime.sink.name,
        sink_type = runtime.sink.sink_type.as_str(),
        message_type = %runtime.schema.message_type,
        workers = runtime.worker.workers,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&runtime);
        return Ok(());
    }

    if let Some(exporter) = MetricsExporterConfig::for_sink(&runtime.sink, &runtime.telemetry)? {
        observability::init_metrics_exporter(&exporter)?;
        info!("Metrics endpoint available on port {}", exporter.port);
    }
    let span = observability::sink_span(&runtime.sink);

    let pipeline = Pipeline::new(PipelineConfig {
        runtime,
        input: args.input.clone(),
        failed_output: args.failed_output.clone(),
    });

    info!(input = %args.input.display(), "Starting pipeline...");

    // Run pipeline with shutdown signal
    tokio::select! {
        result = pipeline.run().instrument(span) => {
            let stats = result.context("Pipeline execution failed")?;
            stats.print_summary();

            if let Some(failure) = stats.structural_failure {
                anyhow::bail!("Sink stopped on structural failure: {failure}");
            }
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Sink runner finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(runtime: &SinkRuntimeConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Schema:");
    println!("  Descriptor set: {}", runtime.schema.descriptor_set.display());
    println!("  Message type: {}", runtime.schema.message_type);
    if let Some(ref key_type) = runtime.schema.key_message_type {
        println!("  Key message type: {}", key_type);
    }

    println!("\nSink:");
    println!("  Name: {}", runtime.sink.name);
    println!("  Type: {}", runtime.sink.sink_type.as_str());
    if let Some(ref service_url) = runtime.sink.service_url {
        println!("  Service URL: {}", service_url);
        println!("  Parameter source: {}", runtime.sink.parameter_source);
    }
    for (key, value) in &runtime.sink.params {
        println!("  {key} = {value}");
    }

    println!("\nWorkers:");
    println!("  Count: {}", runtime.worker.workers);
    println!("  Queue capacity: {}", runtime.worker.queue_capacity);
    println!("  Batch size: {}", runtime.worker.batch_size);

    if let Some(port) = runtime.telemetry.metrics_port {
        println!("\nMetrics port: {}", port);
    }

    println!();
}
