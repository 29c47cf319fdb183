//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::ResolutionMode;
use std::path::PathBuf;

/// Sink Runner - templated sink connector runtime
#[derive(Parser, Debug)]
#[command(
    name = "sink-runner",
    author,
    version,
    about = "Templated sink connector runtime",
    long_about = "Pushes broker records through a pool of sink workers.\n\n\
                  Each record's destination is rendered from a printf-style template \n\
                  whose placeholders are filled from protobuf fields of the record key or value."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SINK_RUNNER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SINK_RUNNER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Push NDJSON records through the configured sink
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Resolve a destination template against one record
    Resolve(ResolveArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "sink.toml", env = "SINK_RUNNER_CONFIG")]
    pub config: PathBuf,

    /// NDJSON input, one record per line ("-" for stdin)
    #[arg(short, long, env = "SINK_RUNNER_INPUT")]
    pub input: PathBuf,

    /// NDJSON file receiving records the sink did not deliver
    #[arg(long, env = "SINK_RUNNER_FAILED_OUTPUT")]
    pub failed_output: Option<PathBuf>,

    /// Prometheus port, overrides `telemetry.metrics_port` (0 = disabled)
    #[arg(long, env = "SINK_RUNNER_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "sink.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `resolve` command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "sink.toml")]
    pub config: PathBuf,

    /// Template to resolve (defaults to `sink.service_url`)
    #[arg(short, long)]
    pub template: Option<String>,

    /// Record half feeding the template (defaults to `sink.parameter_source`)
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Base64 record key
    #[arg(long, default_value = "")]
    pub key: String,

    /// Base64 record value
    #[arg(long)]
    pub value: String,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Record half selector
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Mode {
    Key,
    Message,
}

impl From<Mode> for ResolutionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Key => Self::Key,
            Mode::Message => Self::Message,
        }
    }
}
