//! HTTP 响应辅助函数和 DTO 转换
//!
//! 错误码与 HTTP 状态码的对应：
//! - `INVALID.REQUEST` 400：请求字段缺失或取值非法
//! - `RESOURCE.NOT_FOUND` 404
//! - `ALARM.INVALID_TRANSITION` 400：非法的告警状态流转
//! - `CONTROL.INTERLOCK` 403：安全联锁阻止（附带设备与判定）
//! - `CONTROL.DEVICE_DISABLED` 403
//! - `CONFLICT` 409：并发冲突或资源被引用
//! - `INTERNAL.ERROR` 500：存储层错误

use api_contract::{
    AlarmDto, AlarmRuleDto, ApiResponse, AuditLogDto, ControlDeviceDto, DeviceDto, EvaluationDto,
    InterlockDto, ReadingDto, RuleErrorDto,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DeviceAction, SensorReading};
use greenhouse_alarm::{AlarmError, EvaluationOutcome, RuleErrorKind};
use greenhouse_control::{ControlError, InterlockVerdict};
use greenhouse_storage::{AlarmRecord, AlarmRuleRecord, AuditLogRecord, DeviceRecord, StorageError};
use tracing::warn;

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(code, message.into()))).into_response()
}

/// 成功响应
pub fn ok<T: serde::Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, "INVALID.REQUEST", message)
}

/// 资源未找到错误响应
pub fn not_found_error(message: impl Into<String>) -> Response {
    error_response(StatusCode::NOT_FOUND, "RESOURCE.NOT_FOUND", message)
}

/// 冲突错误响应
pub fn conflict_error(message: impl Into<String>) -> Response {
    error_response(StatusCode::CONFLICT, "CONFLICT", message)
}

/// 存储错误响应
pub fn storage_error(err: StorageError) -> Response {
    internal_error(err.to_string())
}

fn internal_error(message: String) -> Response {
    warn!(target: "greenhouse.api", error = %message, "internal_error");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR", message)
}

/// 告警能力错误响应
pub fn alarm_error(err: AlarmError) -> Response {
    match err {
        AlarmError::NotFound(_) => not_found_error(err.to_string()),
        AlarmError::Validation(message) => bad_request_error(message),
        AlarmError::Configuration { .. } => bad_request_error(err.to_string()),
        AlarmError::InvalidTransition(_) => error_response(
            StatusCode::BAD_REQUEST,
            "ALARM.INVALID_TRANSITION",
            err.to_string(),
        ),
        AlarmError::Conflict(_) => conflict_error(err.to_string()),
        AlarmError::Storage(message) => internal_error(message),
    }
}

/// 控制能力错误响应
pub fn control_error(err: ControlError) -> Response {
    match err {
        ControlError::NotFound(_) => not_found_error(err.to_string()),
        ControlError::DeviceDisabled(_) => error_response(
            StatusCode::FORBIDDEN,
            "CONTROL.DEVICE_DISABLED",
            err.to_string(),
        ),
        ControlError::InvalidAction { .. } => bad_request_error(err.to_string()),
        ControlError::Interlock {
            reason,
            action,
            device,
            verdict,
        } => {
            let data = ControlDeviceDto {
                message: reason.clone(),
                device: device_to_dto(*device),
                interlock: interlock_to_dto(action, verdict),
            };
            (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error_with_data(
                    "CONTROL.INTERLOCK",
                    format!("Safety interlock active: {}", reason),
                    data,
                )),
            )
                .into_response()
        }
        ControlError::Conflict(_) => conflict_error(err.to_string()),
        ControlError::Storage(message) => internal_error(message),
    }
}

/// DeviceRecord 转 DeviceDto
pub fn device_to_dto(record: DeviceRecord) -> DeviceDto {
    DeviceDto {
        device_id: record.device_id,
        control_id: record.control_id,
        name: record.name,
        device_type: record.device_type.to_string(),
        purpose: record.purpose.to_string(),
        status: record.status,
        is_enabled: record.is_enabled,
        last_status_update_ms: record.last_status_update_ms,
        version: record.version,
        interlock: None,
    }
}

/// 联锁判定转 InterlockDto
pub fn interlock_to_dto(action: DeviceAction, verdict: InterlockVerdict) -> InterlockDto {
    InterlockDto {
        action: action.to_string(),
        blocked: verdict.blocked,
        reason: verdict.reason,
        conditions: verdict.conditions,
    }
}

/// AlarmRecord 转 AlarmDto
pub fn alarm_to_dto(record: AlarmRecord) -> AlarmDto {
    AlarmDto {
        alarm_id: record.alarm_id,
        ts_ms: record.ts_ms,
        device_id: record.device_id,
        alarm_type: record.alarm_type,
        severity: record.severity.to_string(),
        status: record.status.to_string(),
        details: record.details,
        triggered_by_rule_id: record.triggered_by_rule_id,
        acknowledged_at_ms: record.acknowledged_at_ms,
        cleared_at_ms: record.cleared_at_ms,
        updated_at_ms: record.updated_at_ms,
    }
}

/// AlarmRuleRecord 转 AlarmRuleDto
pub fn rule_to_dto(record: AlarmRuleRecord) -> AlarmRuleDto {
    AlarmRuleDto {
        rule_id: record.rule_id,
        name: record.name,
        device_id: record.device_id,
        sensor_metric: record.sensor_metric,
        condition: record.condition.to_string(),
        threshold_value: record.threshold_value,
        severity: record.severity.to_string(),
        is_active: record.is_active,
        cooldown_period_seconds: record.cooldown_period_seconds,
    }
}

/// SensorReading 转 ReadingDto
pub fn reading_to_dto(reading: SensorReading) -> ReadingDto {
    ReadingDto {
        reading_id: reading.reading_id,
        ts_ms: reading.ts_ms,
        metrics: reading
            .metrics
            .into_iter()
            .map(|(metric, value)| (metric.as_str().to_string(), value))
            .collect(),
    }
}

/// 评估结果转 EvaluationDto
pub fn evaluation_to_dto(reading: SensorReading, outcome: EvaluationOutcome) -> EvaluationDto {
    EvaluationDto {
        reading: reading_to_dto(reading),
        alarms: outcome.alarms.into_iter().map(alarm_to_dto).collect(),
        suppressed: outcome.suppressed,
        auto_cleared: outcome.auto_cleared.into_iter().map(alarm_to_dto).collect(),
        errors: outcome
            .errors
            .into_iter()
            .map(|error| RuleErrorDto {
                device_id: error.device_id,
                rule_id: error.rule_id,
                rule_name: error.rule_name,
                kind: match error.kind {
                    RuleErrorKind::Configuration => "configuration",
                    RuleErrorKind::Storage => "storage",
                    RuleErrorKind::Conflict => "conflict",
                }
                .to_string(),
                message: error.message,
            })
            .collect(),
    }
}

/// AuditLogRecord 转 AuditLogDto
pub fn audit_log_to_dto(record: AuditLogRecord) -> AuditLogDto {
    AuditLogDto {
        audit_id: record.audit_id,
        actor: record.actor,
        action: record.action,
        resource: record.resource,
        result: record.result,
        detail: record.detail,
        ts_ms: record.ts_ms,
    }
}
