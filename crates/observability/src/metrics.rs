//! Sink 执行遥测模块
//!
//! 实现 [`Instrumentation`]：基于 `metrics` facade 记录执行指标，
//! 所有指标都带全局标签 (global tags)，同时在内存中聚合统计摘要。

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use contracts::{Instrumentation, Record, SinkError, TelemetryError};
use metrics::{counter, histogram, Label};

/// 基于 `metrics` 的遥测实现
///
/// 指标:
/// - `sink_message_lifetime_ms` (histogram, 每条记录)
/// - `sink_executions_started_total` (counter)
/// - `sink_messages_total{status}` (counter)
/// - `sink_response_time_ms` (histogram)
/// - `sink_push_batch_size` (histogram)
/// - `sink_errors_total{error_type}` (counter)
#[derive(Debug, Default)]
pub struct MetricsInstrumentation {
    global_tags: Vec<(String, String)>,
    aggregator: Mutex<ExecutionAggregator>,
}

impl MetricsInstrumentation {
    /// 创建实例，`global_tags` 附加到每个指标
    pub fn new(global_tags: &BTreeMap<String, String>) -> Self {
        Self {
            global_tags: global_tags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            aggregator: Mutex::default(),
        }
    }

    /// 当前聚合摘要
    pub fn summary(&self) -> ExecutionSummary {
        self.aggregator
            .lock()
            .map(|aggregator| aggregator.summary())
            .unwrap_or_default()
    }

    fn labels(&self, extra: &[(&'static str, &str)]) -> Vec<Label> {
        self.global_tags
            .iter()
            .map(|(k, v)| Label::new(k.clone(), v.clone()))
            .chain(extra.iter().map(|(k, v)| Label::new(*k, v.to_string())))
            .collect()
    }

    fn aggregate(
        &self,
        update: impl FnOnce(&mut ExecutionAggregator),
    ) -> Result<(), TelemetryError> {
        let mut aggregator = self
            .aggregator
            .lock()
            .map_err(|_| TelemetryError::new("execution aggregator poisoned"))?;
        update(&mut aggregator);
        Ok(())
    }
}

impl Instrumentation for MetricsInstrumentation {
    fn lifetime(&self, sink_type: &str, records: &[Record]) -> Result<(), TelemetryError> {
        let now = SystemTime::now();
        let lifetimes: Vec<f64> = records
            .iter()
            .filter_map(|record| record.lifetime_at(now))
            .map(duration_ms)
            .collect();

        for ms in &lifetimes {
            histogram!(
                "sink_message_lifetime_ms",
                self.labels(&[("sink_type", sink_type)])
            )
            .record(*ms);
        }
        self.aggregate(|a| lifetimes.iter().for_each(|ms| a.lifetime_ms.push(*ms)))
    }

    fn execution_started(&self) -> Result<(), TelemetryError> {
        counter!("sink_executions_started_total", self.labels(&[])).increment(1);
        self.aggregate(|a| a.executions_started += 1)
    }

    fn execution_succeeded(
        &self,
        sink_type: &str,
        records: &[Record],
        response_time: Duration,
    ) -> Result<(), TelemetryError> {
        let ms = duration_ms(response_time);
        counter!(
            "sink_messages_total",
            self.labels(&[("sink_type", sink_type), ("status", "success")])
        )
        .increment(records.len() as u64);
        histogram!(
            "sink_response_time_ms",
            self.labels(&[("sink_type", sink_type)])
        )
        .record(ms);
        histogram!(
            "sink_push_batch_size",
            self.labels(&[("sink_type", sink_type)])
        )
        .record(records.len() as f64);

        self.aggregate(|a| {
            a.succeeded_batches += 1;
            a.messages_succeeded += records.len() as u64;
            a.response_time_ms.push(ms);
            a.batch_size.push(records.len() as f64);
        })
    }

    fn execution_failed(
        &self,
        sink_type: &str,
        error: &SinkError,
        records: &[Record],
        response_time: Duration,
    ) -> Result<(), TelemetryError> {
        let ms = duration_ms(response_time);
        counter!(
            "sink_messages_total",
            self.labels(&[("sink_type", sink_type), ("status", "failure")])
        )
        .increment(records.len() as u64);
        counter!(
            "sink_errors_total",
            self.labels(&[("sink_type", sink_type), ("error_type", error.kind())])
        )
        .increment(1);
        histogram!(
            "sink_response_time_ms",
            self.labels(&[("sink_type", sink_type)])
        )
        .record(ms);
        histogram!(
            "sink_push_batch_size",
            self.labels(&[("sink_type", sink_type)])
        )
        .record(records.len() as f64);

        self.aggregate(|a| {
            a.failed_batches += 1;
            a.messages_failed += records.len() as u64;
            *a.errors.entry(error.kind().to_string()).or_insert(0) += 1;
            a.response_time_ms.push(ms);
            a.batch_size.push(records.len() as f64);
        })
    }
}

/// 空实现：不记录任何遥测
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {
    fn lifetime(&self, _sink_type: &str, _records: &[Record]) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn execution_started(&self) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn execution_succeeded(
        &self,
        _sink_type: &str,
        _records: &[Record],
        _response_time: Duration,
    ) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn execution_failed(
        &self,
        _sink_type: &str,
        _error: &SinkError,
        _records: &[Record],
        _response_time: Duration,
    ) -> Result<(), TelemetryError> {
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// 执行指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ExecutionAggregator {
    /// 开始执行的批次数
    pub executions_started: u64,

    /// 执行成功的批次数
    pub succeeded_batches: u64,

    /// 执行失败的批次数 (整批失败)
    pub failed_batches: u64,

    /// 成功批次中的消息数
    pub messages_succeeded: u64,

    /// 失败批次中的消息数
    pub messages_failed: u64,

    /// 各错误类型次数
    pub errors: BTreeMap<String, u64>,

    /// 响应时间统计 (毫秒)
    pub response_time_ms: RunningStats,

    /// 批大小统计
    pub batch_size: RunningStats,

    /// 消息生命周期统计 (毫秒)
    pub lifetime_ms: RunningStats,
}

impl ExecutionAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> ExecutionSummary {
        let batches = self.succeeded_batches + self.failed_batches;
        ExecutionSummary {
            executions_started: self.executions_started,
            succeeded_batches: self.succeeded_batches,
            failed_batches: self.failed_batches,
            messages_succeeded: self.messages_succeeded,
            messages_failed: self.messages_failed,
            failure_rate: if batches > 0 {
                self.failed_batches as f64 / batches as f64 * 100.0
            } else {
                0.0
            },
            errors: self.errors.clone(),
            response_time_ms: StatsSummary::from(&self.response_time_ms),
            batch_size: StatsSummary::from(&self.batch_size),
            lifetime_ms: StatsSummary::from(&self.lifetime_ms),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 执行摘要
#[derive(Debug, Clone, Default)]
pub struct ExecutionSummary {
    pub executions_started: u64,
    pub succeeded_batches: u64,
    pub failed_batches: u64,
    pub messages_succeeded: u64,
    pub messages_failed: u64,
    pub failure_rate: f64,
    pub errors: BTreeMap<String, u64>,
    pub response_time_ms: StatsSummary,
    pub batch_size: StatsSummary,
    pub lifetime_ms: StatsSummary,
}

impl std::fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sink Execution Summary ===")?;
        writeln!(f, "Executions started: {}", self.executions_started)?;
        writeln!(
            f,
            "Batches: {} succeeded, {} failed ({:.2}%)",
            self.succeeded_batches, self.failed_batches, self.failure_rate
        )?;
        writeln!(
            f,
            "Messages: {} in succeeded batches, {} in failed batches",
            self.messages_succeeded, self.messages_failed
        )?;
        writeln!(f, "Response time (ms): {}", self.response_time_ms)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Message lifetime (ms): {}", self.lifetime_ms)?;

        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for (error_type, count) in &self.errors {
                writeln!(f, "  {}: {}", error_type, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
