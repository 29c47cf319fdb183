//! 配置验证模块
//!
//! 先执行 `validator` derive 的字段规则，再检查跨字段约束：
//! - 目标模板可解析
//! - `file` sink 必须有 `service_url` 与 `params.base_path`
//! - 描述符路径非空

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};
use contracts::{ContractError, SinkConfig, SinkRuntimeConfig, SinkType};
use resolver::{ResolveError, Template};

/// 验证 SinkRuntimeConfig
pub fn validate(config: &SinkRuntimeConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_descriptor_set(config)?;
    validate_service_url(&config.sink)?;
    validate_file_sink(&config.sink)?;
    Ok(())
}

/// 字段级规则 (长度、范围)
fn validate_fields(config: &SinkRuntimeConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 按字段名排序后取第一个违规项，保证错误信息稳定
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields.into_iter().find_map(|(field, kind)| {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("failed '{}' check", error.code));
                (path, message)
            }),
            ValidationErrorsKind::Struct(inner) => first_violation(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(index, inner)| first_violation(inner, &format!("{path}[{index}]"))),
        }
    })
}

fn validate_descriptor_set(config: &SinkRuntimeConfig) -> Result<(), ContractError> {
    if config.schema.descriptor_set.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "schema.descriptor_set",
            "descriptor set path cannot be empty",
        ));
    }
    Ok(())
}

/// 模板必须在启动时可解析，避免每条记录都失败
fn validate_service_url(sink: &SinkConfig) -> Result<(), ContractError> {
    let Some(service_url) = &sink.service_url else {
        return Ok(());
    };
    Template::parse(service_url).map_err(|e| {
        let message = match &e {
            ResolveError::InvalidTemplate { reason, .. } => format!("{e}: {reason}"),
            ResolveError::InvalidFieldIndex { token, .. } => format!("{e}: '{token}'"),
            _ => e.to_string(),
        };
        ContractError::config_validation("sink.service_url", message)
    })?;
    Ok(())
}

fn validate_file_sink(sink: &SinkConfig) -> Result<(), ContractError> {
    if sink.sink_type != SinkType::File {
        return Ok(());
    }
    if sink.service_url.is_none() {
        return Err(ContractError::config_validation(
            "sink.service_url",
            "file sink requires a destination template",
        ));
    }
    let has_base_path = sink
        .params
        .get("base_path")
        .is_some_and(|path| !path.trim().is_empty());
    if !has_base_path {
        return Err(ContractError::config_validation(
            "sink.params.base_path",
            "file sink requires 'base_path'",
        ));
    }
    Ok(())
}
