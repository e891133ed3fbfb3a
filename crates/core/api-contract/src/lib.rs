//! 稳定的 DTO 与 API 响应契约。
//!
//! 枚举字段（状态、严重级别、条件、设备类型、动作）在这里保持为字符串，
//! 由宿主在边界处解析为领域类型，非法值返回 `INVALID.REQUEST`。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// 失败但仍附带上下文数据（如联锁阻止时的设备与判定）。
    pub fn error_with_data(code: impl Into<String>, message: impl Into<String>, data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::error(code, message)
        }
    }
}

// ---------------------------------------------------------------------------
// 读数
// ---------------------------------------------------------------------------

/// 读数上报请求体。值为 null 或缺失的指标视为传感器离线。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingRequest {
    #[serde(alias = "reading_id")]
    pub reading_id: Option<String>,
    /// 缺省时取服务端当前时间
    #[serde(alias = "ts_ms", alias = "timestamp")]
    pub ts_ms: Option<i64>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Option<f64>>,
}

/// 读数返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub reading_id: String,
    pub ts_ms: i64,
    pub metrics: BTreeMap<String, f64>,
}

/// 单条规则的评估错误。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleErrorDto {
    pub device_id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub kind: String,
    pub message: String,
}

/// 读数上报后的评估结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDto {
    pub reading: ReadingDto,
    pub alarms: Vec<AlarmDto>,
    pub suppressed: usize,
    pub auto_cleared: Vec<AlarmDto>,
    pub errors: Vec<RuleErrorDto>,
}

// ---------------------------------------------------------------------------
// 告警
// ---------------------------------------------------------------------------

/// 告警返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmDto {
    pub alarm_id: String,
    pub ts_ms: i64,
    pub device_id: Option<String>,
    pub alarm_type: String,
    pub severity: String,
    pub status: String,
    pub details: String,
    pub triggered_by_rule_id: Option<String>,
    pub acknowledged_at_ms: Option<i64>,
    pub cleared_at_ms: Option<i64>,
    pub updated_at_ms: i64,
}

/// 告警列表查询参数。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmListQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
    #[serde(alias = "device_id")]
    pub device_id: Option<String>,
    /// timestamp | severity | status
    #[serde(alias = "sort_by")]
    pub sort_by: Option<String>,
    /// asc | desc
    pub order: Option<String>,
    pub limit: Option<i64>,
}

/// 告警状态更新请求体。
#[derive(Debug, Deserialize)]
pub struct UpdateAlarmStatusRequest {
    pub status: String,
}

// ---------------------------------------------------------------------------
// 告警规则
// ---------------------------------------------------------------------------

/// 告警规则创建请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlarmRuleRequest {
    pub name: String,
    #[serde(alias = "device_id")]
    pub device_id: String,
    #[serde(alias = "sensor_metric")]
    pub sensor_metric: String,
    pub condition: String,
    #[serde(alias = "threshold_value")]
    pub threshold_value: f64,
    pub severity: Option<String>,
    #[serde(alias = "is_active")]
    pub is_active: Option<bool>,
    #[serde(alias = "cooldown_period_seconds")]
    pub cooldown_period_seconds: Option<u32>,
}

/// 告警规则更新请求体。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlarmRuleRequest {
    pub name: Option<String>,
    #[serde(alias = "device_id")]
    pub device_id: Option<String>,
    #[serde(alias = "sensor_metric")]
    pub sensor_metric: Option<String>,
    pub condition: Option<String>,
    #[serde(alias = "threshold_value")]
    pub threshold_value: Option<f64>,
    pub severity: Option<String>,
    #[serde(alias = "is_active")]
    pub is_active: Option<bool>,
    #[serde(alias = "cooldown_period_seconds")]
    pub cooldown_period_seconds: Option<u32>,
}

/// 告警规则返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRuleDto {
    pub rule_id: String,
    pub name: String,
    pub device_id: String,
    pub sensor_metric: String,
    pub condition: String,
    pub threshold_value: f64,
    pub severity: String,
    pub is_active: bool,
    pub cooldown_period_seconds: u32,
}

// ---------------------------------------------------------------------------
// 设备与控制
// ---------------------------------------------------------------------------

/// 设备创建请求体。
///
/// 给出 `deviceType`（可选 `purpose`），或旧式标签 `label`（如 `"PUMP water main"`），二选一。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    #[serde(alias = "control_id")]
    pub control_id: String,
    pub name: String,
    #[serde(alias = "device_type")]
    pub device_type: Option<String>,
    pub purpose: Option<String>,
    pub label: Option<String>,
    #[serde(alias = "is_enabled")]
    pub is_enabled: Option<bool>,
}

/// 设备更新请求体（状态只能通过控制命令修改）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    #[serde(alias = "is_enabled")]
    pub is_enabled: Option<bool>,
}

/// 联锁判定。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterlockDto {
    /// 判定针对的动作
    pub action: String,
    pub blocked: bool,
    pub reason: Option<String>,
    pub conditions: BTreeMap<String, serde_json::Value>,
}

/// 设备返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub device_id: String,
    pub control_id: String,
    pub name: String,
    pub device_type: String,
    pub purpose: String,
    pub status: String,
    pub is_enabled: bool,
    pub last_status_update_ms: Option<i64>,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interlock: Option<InterlockDto>,
}

/// 设备控制请求体。
#[derive(Debug, Deserialize)]
pub struct ControlDeviceRequest {
    pub action: String,
}

/// 设备控制返回结构（成功与联锁阻止共用）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDeviceDto {
    pub message: String,
    pub device: DeviceDto,
    pub interlock: InterlockDto,
}

/// 审计日志查询参数（`resource` 形如 `device:main-pump`）。
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub resource: Option<String>,
    pub limit: Option<i64>,
}

/// 审计日志返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogDto {
    pub audit_id: String,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub result: String,
    pub detail: Option<String>,
    pub ts_ms: i64,
}
