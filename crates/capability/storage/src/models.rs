//! 数据模型
//!
//! 定义所有存储相关的数据模型和更新结构：
//! - 设备模型：DeviceRecord, DeviceUpdate
//! - 告警规则模型：AlarmRuleRecord, AlarmRuleUpdate
//! - 告警模型：AlarmRecord, AlarmQuery
//! - 审计模型：AuditLogRecord
//!
//! 传感器读数直接使用 `domain::SensorReading`。

use domain::{
    AlarmCondition, AlarmSeverity, AlarmStatus, DeviceClass, DevicePurpose, DeviceType,
};

/// 新设备的初始状态。
pub const DEVICE_STATUS_UNKNOWN: &str = "UNKNOWN";

/// 设备记录。
///
/// `version` 在每次状态写入时递增，用于乐观并发校验。
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub device_id: String,
    /// 硬件控制标识（唯一）
    pub control_id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub purpose: DevicePurpose,
    pub status: String,
    pub is_enabled: bool,
    pub last_status_update_ms: Option<i64>,
    pub version: i64,
}

impl DeviceRecord {
    pub fn class(&self) -> DeviceClass {
        DeviceClass::new(self.device_type, self.purpose)
    }
}

/// 设备更新输入（状态只能通过控制命令修改）。
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub is_enabled: Option<bool>,
}

/// 告警规则记录。
///
/// `sensor_metric` 按存储原样保留字符串，评估时再解析，
/// 以便发现表结构漂移导致的非法指标。
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRuleRecord {
    pub rule_id: String,
    pub name: String,
    pub device_id: String,
    pub sensor_metric: String,
    pub condition: AlarmCondition,
    pub threshold_value: f64,
    pub severity: AlarmSeverity,
    pub is_active: bool,
    pub cooldown_period_seconds: u32,
}

impl AlarmRuleRecord {
    /// 冷却窗口（毫秒）。
    pub fn cooldown_ms(&self) -> i64 {
        i64::from(self.cooldown_period_seconds) * 1000
    }

    /// 应用部分更新。
    pub fn apply(&mut self, update: AlarmRuleUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(device_id) = update.device_id {
            self.device_id = device_id;
        }
        if let Some(sensor_metric) = update.sensor_metric {
            self.sensor_metric = sensor_metric;
        }
        if let Some(condition) = update.condition {
            self.condition = condition;
        }
        if let Some(threshold_value) = update.threshold_value {
            self.threshold_value = threshold_value;
        }
        if let Some(severity) = update.severity {
            self.severity = severity;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(cooldown) = update.cooldown_period_seconds {
            self.cooldown_period_seconds = cooldown;
        }
    }
}

/// 告警规则更新输入。
#[derive(Debug, Clone, Default)]
pub struct AlarmRuleUpdate {
    pub name: Option<String>,
    pub device_id: Option<String>,
    pub sensor_metric: Option<String>,
    pub condition: Option<AlarmCondition>,
    pub threshold_value: Option<f64>,
    pub severity: Option<AlarmSeverity>,
    pub is_active: Option<bool>,
    pub cooldown_period_seconds: Option<u32>,
}

/// 告警记录。
///
/// `device_id` 与 `triggered_by_rule_id` 是弱引用，目标被删除后记录仍然有效。
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRecord {
    pub alarm_id: String,
    pub ts_ms: i64,
    pub device_id: Option<String>,
    pub alarm_type: String,
    pub severity: AlarmSeverity,
    pub status: AlarmStatus,
    pub details: String,
    pub triggered_by_rule_id: Option<String>,
    pub acknowledged_at_ms: Option<i64>,
    pub cleared_at_ms: Option<i64>,
    pub updated_at_ms: i64,
}

/// 告警排序字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmSortField {
    #[default]
    Timestamp,
    Severity,
    Status,
}

/// 排序方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// 告警列表查询条件。
#[derive(Debug, Clone, Default)]
pub struct AlarmQuery {
    pub status: Option<AlarmStatus>,
    pub severity: Option<AlarmSeverity>,
    pub device_id: Option<String>,
    pub sort_by: AlarmSortField,
    pub order: SortOrder,
    pub limit: Option<i64>,
}

impl AlarmQuery {
    pub fn matches(&self, alarm: &AlarmRecord) -> bool {
        if let Some(status) = self.status {
            if alarm.status != status {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if alarm.severity != severity {
                return false;
            }
        }
        if let Some(device_id) = self.device_id.as_deref() {
            if alarm.device_id.as_deref() != Some(device_id) {
                return false;
            }
        }
        true
    }
}

/// 审计日志记录（设备控制、告警状态变更）。
///
/// `resource` 形如 `device:{control_id}`、`alarm:{alarm_id}`。
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogRecord {
    pub audit_id: String,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub result: String,
    pub detail: Option<String>,
    pub ts_ms: i64,
}

impl AuditLogRecord {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        result: impl Into<String>,
        ts_ms: i64,
    ) -> Self {
        Self {
            audit_id: uuid::Uuid::new_v4().to_string(),
            actor: actor.into(),
            action: action.into(),
            resource: resource.into(),
            result: result.into(),
            detail: None,
            ts_ms,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// 审计日志查询。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    /// 精确匹配的资源标识
    pub resource: Option<String>,
    pub limit: usize,
}

impl AuditQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            resource: None,
            limit,
        }
    }

    pub fn for_resource(resource: impl Into<String>, limit: usize) -> Self {
        Self {
            resource: Some(resource.into()),
            limit,
        }
    }
}
