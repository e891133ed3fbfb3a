//! 告警规则管理。
//!
//! 写入前校验：名称非空、设备存在、指标为已知数值指标、阈值为有限值。
//! 指标按规范名（snake_case）落库。

use crate::cooldown::CooldownTracker;
use crate::error::AlarmError;
use domain::{AlarmCondition, AlarmSeverity, SensorMetric};
use greenhouse_storage::{AlarmRuleRecord, AlarmRuleStore, AlarmRuleUpdate, DeviceStore};
use std::sync::Arc;
use tracing::info;

/// 新建规则输入。未给出的字段取默认值：严重级别 WARNING、启用、
/// 冷却时间取服务配置（默认 300 秒）。
#[derive(Debug, Clone)]
pub struct NewAlarmRule {
    pub name: String,
    pub device_id: String,
    pub sensor_metric: String,
    pub condition: AlarmCondition,
    pub threshold_value: f64,
    pub severity: Option<AlarmSeverity>,
    pub is_active: Option<bool>,
    pub cooldown_period_seconds: Option<u32>,
}

#[derive(Clone)]
pub struct RuleService {
    rule_store: Arc<dyn AlarmRuleStore>,
    device_store: Arc<dyn DeviceStore>,
    cooldown: Arc<CooldownTracker>,
    default_cooldown_seconds: u32,
}

impl RuleService {
    pub fn new(
        rule_store: Arc<dyn AlarmRuleStore>,
        device_store: Arc<dyn DeviceStore>,
        cooldown: Arc<CooldownTracker>,
        default_cooldown_seconds: u32,
    ) -> Self {
        Self {
            rule_store,
            device_store,
            cooldown,
            default_cooldown_seconds,
        }
    }

    pub async fn list_rules(&self) -> Result<Vec<AlarmRuleRecord>, AlarmError> {
        Ok(self.rule_store.list_rules().await?)
    }

    pub async fn get_rule(&self, rule_id: &str) -> Result<AlarmRuleRecord, AlarmError> {
        self.rule_store
            .find_rule(rule_id)
            .await?
            .ok_or_else(|| AlarmError::NotFound(format!("alarm rule {}", rule_id)))
    }

    pub async fn create_rule(&self, input: NewAlarmRule) -> Result<AlarmRuleRecord, AlarmError> {
        let name = normalize_name(&input.name)?;
        self.ensure_device(&input.device_id).await?;
        let metric = parse_metric(&input.sensor_metric)?;
        ensure_threshold(input.threshold_value)?;

        let record = AlarmRuleRecord {
            rule_id: uuid::Uuid::new_v4().to_string(),
            name,
            device_id: input.device_id,
            sensor_metric: metric.as_str().to_string(),
            condition: input.condition,
            threshold_value: input.threshold_value,
            severity: input.severity.unwrap_or_default(),
            is_active: input.is_active.unwrap_or(true),
            cooldown_period_seconds: input
                .cooldown_period_seconds
                .unwrap_or(self.default_cooldown_seconds),
        };
        let record = self.rule_store.create_rule(record).await?;
        info!(
            target: "greenhouse.alarm",
            rule_id = %record.rule_id,
            device_id = %record.device_id,
            sensor_metric = %record.sensor_metric,
            condition = %record.condition,
            threshold = record.threshold_value,
            "alarm_rule_created"
        );
        Ok(record)
    }

    pub async fn update_rule(
        &self,
        rule_id: &str,
        mut update: AlarmRuleUpdate,
    ) -> Result<AlarmRuleRecord, AlarmError> {
        if let Some(name) = update.name.as_deref() {
            update.name = Some(normalize_name(name)?);
        }
        if let Some(device_id) = update.device_id.as_deref() {
            self.ensure_device(device_id).await?;
        }
        if let Some(metric) = update.sensor_metric.as_deref() {
            update.sensor_metric = Some(parse_metric(metric)?.as_str().to_string());
        }
        if let Some(threshold_value) = update.threshold_value {
            ensure_threshold(threshold_value)?;
        }
        let record = self
            .rule_store
            .update_rule(rule_id, update)
            .await?
            .ok_or_else(|| AlarmError::NotFound(format!("alarm rule {}", rule_id)))?;
        info!(
            target: "greenhouse.alarm",
            rule_id = %record.rule_id,
            is_active = record.is_active,
            "alarm_rule_updated"
        );
        Ok(record)
    }

    /// 删除规则并清除其冷却状态。历史告警保留。
    pub async fn delete_rule(&self, rule_id: &str) -> Result<(), AlarmError> {
        if !self.rule_store.delete_rule(rule_id).await? {
            return Err(AlarmError::NotFound(format!("alarm rule {}", rule_id)));
        }
        self.cooldown.reset(rule_id).await?;
        info!(target: "greenhouse.alarm", rule_id = %rule_id, "alarm_rule_deleted");
        Ok(())
    }

    async fn ensure_device(&self, device_id: &str) -> Result<(), AlarmError> {
        if self.device_store.find_device(device_id).await?.is_none() {
            return Err(AlarmError::Validation(format!(
                "device not found: {}",
                device_id
            )));
        }
        Ok(())
    }
}

fn normalize_name(name: &str) -> Result<String, AlarmError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AlarmError::Validation("name required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_metric(value: &str) -> Result<SensorMetric, AlarmError> {
    value
        .parse::<SensorMetric>()
        .map_err(|err| AlarmError::Validation(err.to_string()))
}

fn ensure_threshold(value: f64) -> Result<(), AlarmError> {
    if !value.is_finite() {
        return Err(AlarmError::Validation(
            "threshold_value must be finite".to_string(),
        ));
    }
    Ok(())
}
