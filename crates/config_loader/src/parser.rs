//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。
//!
//! 解析分两步：先读成文档树，规范化 `[sink]` 中的枚举字段
//! (`sink_type`、`parameter_source`，大小写与首尾空白不敏感)，
//! 再反序列化为 [`SinkRuntimeConfig`]。枚举值非法时报告字段路径与可选值。

use contracts::{ContractError, ResolutionMode, SinkRuntimeConfig, SinkType};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

type Canonicalize = fn(&str) -> Result<&'static str, ContractError>;

/// `[sink]` 中需要规范化的枚举字段
const SINK_ENUM_FIELDS: [(&str, Canonicalize); 2] = [
    ("sink_type", canonical_sink_type),
    ("parameter_source", canonical_parameter_source),
];

const SINK_TYPES: [SinkType; 2] = [SinkType::Log, SinkType::File];

fn canonical_sink_type(raw: &str) -> Result<&'static str, ContractError> {
    let wanted = raw.trim().to_ascii_lowercase();
    SINK_TYPES
        .iter()
        .map(SinkType::as_str)
        .find(|name| *name == wanted)
        .ok_or_else(|| {
            let supported: Vec<_> = SINK_TYPES.iter().map(SinkType::as_str).collect();
            ContractError::config_validation(
                "sink.sink_type",
                format!(
                    "unsupported sink type '{}', expected one of: {}",
                    raw.trim(),
                    supported.join(", ")
                ),
            )
        })
}

fn canonical_parameter_source(raw: &str) -> Result<&'static str, ContractError> {
    raw.parse::<ResolutionMode>()
        .map(|mode| mode.as_str())
        .map_err(|e| match e {
            ContractError::ConfigValidation { message, .. } => {
                ContractError::config_validation("sink.parameter_source", message)
            }
            other => other,
        })
}

fn toml_error(e: toml::de::Error) -> ContractError {
    ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    }
}

fn json_error(e: serde_json::Error) -> ContractError {
    ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<SinkRuntimeConfig, ContractError> {
    let mut document: toml::Table = toml::from_str(content).map_err(toml_error)?;
    if let Some(toml::Value::Table(sink)) = document.get_mut("sink") {
        for (key, canonicalize) in SINK_ENUM_FIELDS {
            if let Some(toml::Value::String(raw)) = sink.get_mut(key) {
                *raw = canonicalize(raw)?.to_string();
            }
        }
    }
    toml::Value::Table(document)
        .try_into::<SinkRuntimeConfig>()
        .map_err(toml_error)
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SinkRuntimeConfig, ContractError> {
    let mut document: serde_json::Value = serde_json::from_str(content).map_err(json_error)?;
    if let Some(sink) = document.get_mut("sink").and_then(|v| v.as_object_mut()) {
        for (key, canonicalize) in SINK_ENUM_FIELDS {
            if let Some(serde_json::Value::String(raw)) = sink.get_mut(key) {
                *raw = canonicalize(raw)?.to_string();
            }
        }
    }
    serde_json::from_value(document).map_err(json_error)
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<SinkRuntimeConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
