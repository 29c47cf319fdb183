//! # Observability
//!
//! Sink 运行时的可观测性：Tracing 订阅器、Prometheus 导出与执行遥测。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)，[`sink_span`] 为每条日志附加 sink 名称与类型
//! - Prometheus 导出 ([`MetricsExporterConfig`])，以 `sink` 作为全局标签
//! - Sink 执行遥测 ([`MetricsInstrumentation`]) 与统计摘要
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_with_config, MetricsExporterConfig, ObservabilityConfig};
//!
//! init_with_config(ObservabilityConfig::default())?;
//! if let Some(exporter) = MetricsExporterConfig::for_sink(&config.sink, &config.telemetry)? {
//!     observability::init_metrics_exporter(&exporter)?;
//! }
//!
//! let instrumentation = Arc::new(MetricsInstrumentation::new(&config.telemetry.global_tags));
//! pipeline.run().instrument(observability::sink_span(&config.sink)).await?;
//! ```

pub mod metrics;

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use contracts::{SinkConfig, TelemetryConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::Span;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

// Re-exports
pub use crate::metrics::{
    ExecutionAggregator, ExecutionSummary, MetricsInstrumentation, NoopInstrumentation,
    RunningStats, StatsSummary,
};

/// `RUST_LOG` 未设置时，导出器的 HTTP 栈只输出警告
const QUIET_TARGETS: &[&str] = &["hyper=warn", "h2=warn", "metrics_exporter_prometheus=warn"];

/// 日志配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 默认日志级别
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 初始化全局 Tracing 订阅器
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.default_log_level)));

    tracing_subscriber::registry()
        .with(fmt_layer(config.log_format))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(log_format = ?config.log_format, "Observability initialized");
    Ok(())
}

fn default_directives(level: &str) -> String {
    std::iter::once(level)
        .chain(QUIET_TARGETS.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        // worker spans nest under the sink span; only the innermost is printed
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

/// 运行期根 span，其下每条日志都带 `sink` 与 `sink_type`
pub fn sink_span(sink: &SinkConfig) -> Span {
    tracing::info_span!("sink", sink = %sink.name, sink_type = sink.sink_type.as_str())
}

/// Prometheus 导出配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsExporterConfig {
    /// HTTP 监听端口
    pub port: u16,
    /// 导出器附加到每个序列的标签
    pub global_labels: BTreeMap<String, String>,
}

impl MetricsExporterConfig {
    /// 由 sink 与遥测配置构建；端口未设置或为 0 时返回 `None`
    ///
    /// `global_tags` 由 [`MetricsInstrumentation`] 逐条附加，这里只补充
    /// `sink` 标签（`global_tags` 已有同名键时跳过）。
    ///
    /// # Errors
    /// `global_tags` 中存在不合法的 Prometheus 标签名
    pub fn for_sink(sink: &SinkConfig, telemetry: &TelemetryConfig) -> Result<Option<Self>> {
        for name in telemetry.global_tags.keys() {
            check_label_name(name)
                .with_context(|| format!("telemetry.global_tags has an unusable key '{name}'"))?;
        }

        let Some(port) = telemetry.metrics_port.filter(|port| *port != 0) else {
            return Ok(None);
        };

        let mut global_labels = BTreeMap::new();
        if !telemetry.global_tags.contains_key("sink") {
            global_labels.insert("sink".to_string(), sink.name.clone());
        }
        Ok(Some(Self {
            port,
            global_labels,
        }))
    }
}

/// 仅安装 Prometheus 导出器（不初始化 Tracing）
pub fn init_metrics_exporter(config: &MetricsExporterConfig) -> Result<()> {
    let builder = config.global_labels.iter().fold(
        PrometheusBuilder::new().with_http_listener(([0, 0, 0, 0], config.port)),
        |builder, (key, value)| builder.add_global_label(key, value),
    );
    builder
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {}", config.port))?;

    tracing::info!(
        port = config.port,
        labels = ?config.global_labels,
        "Prometheus metrics endpoint initialized"
    );
    Ok(())
}

/// Prometheus 标签名：`[a-zA-Z_][a-zA-Z0-9_]*`，`__` 前缀保留
fn check_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("'{name}' is not a valid label name");
    }
    if name.starts_with("__") {
        bail!("'{name}' uses the reserved '__' prefix");
    }
    Ok(())
}
