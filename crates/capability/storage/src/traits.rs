//! 存储接口 Trait 定义
//!
//! 定义所有资源存储的异步接口：
//! - DeviceStore：设备存储（含带版本校验的状态写入）
//! - ReadingStore：传感器读数存储
//! - AlarmRuleStore：告警规则存储
//! - AlarmStore：告警存储（含条件状态流转）
//! - CooldownStore：规则冷却状态存储（compare-and-set）
//! - AuditLogStore：审计日志存储
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 并发敏感的写入使用条件更新，由调用方决定是否重试
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{
    AlarmQuery, AlarmRecord, AlarmRuleRecord, AlarmRuleUpdate, AuditLogRecord, AuditQuery,
    DeviceRecord, DeviceUpdate,
};
use async_trait::async_trait;
use domain::{AlarmStatus, SensorReading};

/// 设备存储接口
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// 列出所有设备（按名称排序）
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError>;

    /// 查找指定设备
    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError>;

    /// 按控制标识查找设备
    async fn find_by_control_id(
        &self,
        control_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 创建新设备（`control_id` 重复时报错）
    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError>;

    /// 更新设备名称 / 启用标记
    async fn update_device(
        &self,
        device_id: &str,
        update: DeviceUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 写入设备状态。
    ///
    /// 仅当当前 `version == expected_version` 时生效并递增版本；
    /// 版本不一致或设备不存在返回 `None`。
    async fn update_status(
        &self,
        device_id: &str,
        expected_version: i64,
        status: &str,
        ts_ms: i64,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 删除设备
    async fn delete_device(&self, device_id: &str) -> Result<bool, StorageError>;
}

/// 传感器读数存储接口
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// 写入一条读数（读数写入后不可变）
    async fn insert_reading(&self, reading: SensorReading) -> Result<SensorReading, StorageError>;

    /// 最新读数（时间戳最大）
    async fn latest_reading(&self) -> Result<Option<SensorReading>, StorageError>;

    /// 最近的读数（时间倒序）
    async fn list_readings(&self, limit: i64) -> Result<Vec<SensorReading>, StorageError>;
}

/// 告警规则存储接口
#[async_trait]
pub trait AlarmRuleStore: Send + Sync {
    /// 列出所有规则（按名称排序）
    async fn list_rules(&self) -> Result<Vec<AlarmRuleRecord>, StorageError>;

    /// 列出指定设备的启用规则
    async fn list_active_rules_for_device(
        &self,
        device_id: &str,
    ) -> Result<Vec<AlarmRuleRecord>, StorageError>;

    /// 查找指定规则
    async fn find_rule(&self, rule_id: &str) -> Result<Option<AlarmRuleRecord>, StorageError>;

    /// 创建新规则
    async fn create_rule(&self, record: AlarmRuleRecord) -> Result<AlarmRuleRecord, StorageError>;

    /// 更新规则
    async fn update_rule(
        &self,
        rule_id: &str,
        update: AlarmRuleUpdate,
    ) -> Result<Option<AlarmRuleRecord>, StorageError>;

    /// 删除规则（历史告警不受影响）
    async fn delete_rule(&self, rule_id: &str) -> Result<bool, StorageError>;

    /// 统计引用指定设备的规则数量
    async fn count_rules_for_device(&self, device_id: &str) -> Result<usize, StorageError>;
}

/// 告警存储接口
#[async_trait]
pub trait AlarmStore: Send + Sync {
    /// 写入新告警
    async fn create_alarm(&self, record: AlarmRecord) -> Result<AlarmRecord, StorageError>;

    /// 查找指定告警
    async fn find_alarm(&self, alarm_id: &str) -> Result<Option<AlarmRecord>, StorageError>;

    /// 按条件列出告警
    async fn list_alarms(&self, query: &AlarmQuery) -> Result<Vec<AlarmRecord>, StorageError>;

    /// 列出指定规则触发且尚未清除的告警
    async fn list_open_alarms_for_rule(
        &self,
        rule_id: &str,
    ) -> Result<Vec<AlarmRecord>, StorageError>;

    /// 条件状态流转。
    ///
    /// 仅当当前状态为 `from` 时写入 `to`（同时维护确认 / 清除时间）；
    /// 状态不匹配或告警不存在返回 `None`。
    async fn transition_status(
        &self,
        alarm_id: &str,
        from: AlarmStatus,
        to: AlarmStatus,
        ts_ms: i64,
    ) -> Result<Option<AlarmRecord>, StorageError>;
}

/// 规则冷却状态存储接口
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// 规则最近一次触发时间
    async fn last_fired_at_ms(&self, rule_id: &str) -> Result<Option<i64>, StorageError>;

    /// 原子比较并写入触发时间。
    ///
    /// 当前值等于 `expected` 时写入 `next`（`None` 表示清除）并返回 true。
    async fn compare_and_set(
        &self,
        rule_id: &str,
        expected: Option<i64>,
        next: Option<i64>,
    ) -> Result<bool, StorageError>;
}

/// 审计日志存储接口
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// 追加一条审计记录（只追加，不修改）
    async fn append_audit_log(&self, record: AuditLogRecord) -> Result<(), StorageError>;

    /// 按资源过滤的审计记录，时间倒序；同一时间戳按写入倒序
    async fn list_audit_logs(&self, query: &AuditQuery) -> Result<Vec<AuditLogRecord>, StorageError>;
}
