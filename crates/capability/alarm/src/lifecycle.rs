//! 告警生命周期。
//!
//! 创建只产生 ACTIVE 告警；状态更新先经 `AlarmStatus::transition_to` 校验，
//! 再以当前状态为条件写入存储。条件写入失败说明状态已被并发修改，
//! 重新读取后再校验一次，仍失败则返回 `Conflict`。

use crate::error::AlarmError;
use domain::{AlarmStatus, Clock, SensorMetric, SensorReading};
use greenhouse_storage::{
    AlarmQuery, AlarmRecord, AlarmRuleRecord, AlarmStore, AuditLogRecord, AuditLogStore,
};
use greenhouse_telemetry::{
    record_alarm_raised, record_alarm_transition, record_alarm_transition_rejected,
    record_concurrency_conflict,
};
use std::sync::Arc;
use tracing::{info, warn};

/// 阈值告警的类型名。
pub const SENSOR_THRESHOLD_ALARM_TYPE: &str = "Sensor Threshold Exceeded";

/// 系统自身发起的操作（自动清除等）记录的操作者。
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Clone)]
pub struct AlarmLifecycle {
    alarm_store: Arc<dyn AlarmStore>,
    audit_store: Arc<dyn AuditLogStore>,
    clock: Arc<dyn Clock>,
    max_retries: u32,
}

impl AlarmLifecycle {
    pub fn new(
        alarm_store: Arc<dyn AlarmStore>,
        audit_store: Arc<dyn AuditLogStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            alarm_store,
            audit_store,
            clock,
            max_retries: 1,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 为触发的规则创建 ACTIVE 告警，告警时间取读数时间戳。
    pub async fn raise(
        &self,
        rule: &AlarmRuleRecord,
        metric: SensorMetric,
        observed: f64,
        reading: &SensorReading,
    ) -> Result<AlarmRecord, AlarmError> {
        let record = AlarmRecord {
            alarm_id: uuid::Uuid::new_v4().to_string(),
            ts_ms: reading.ts_ms,
            device_id: Some(rule.device_id.clone()),
            alarm_type: SENSOR_THRESHOLD_ALARM_TYPE.to_string(),
            severity: rule.severity,
            status: AlarmStatus::Active,
            details: format!(
                "{}: {} observed {} {} threshold {}",
                rule.name,
                metric,
                observed,
                rule.condition.symbol(),
                rule.threshold_value
            ),
            triggered_by_rule_id: Some(rule.rule_id.clone()),
            acknowledged_at_ms: None,
            cleared_at_ms: None,
            updated_at_ms: self.clock.now_ms(),
        };
        let record = self.alarm_store.create_alarm(record).await?;
        record_alarm_raised();
        info!(
            target: "greenhouse.alarm",
            alarm_id = %record.alarm_id,
            rule_id = %rule.rule_id,
            device_id = %rule.device_id,
            reading_id = %reading.reading_id,
            metric = %metric,
            observed = observed,
            threshold = rule.threshold_value,
            severity = %record.severity,
            "alarm_raised"
        );
        Ok(record)
    }

    pub async fn get(&self, alarm_id: &str) -> Result<AlarmRecord, AlarmError> {
        self.alarm_store
            .find_alarm(alarm_id)
            .await?
            .ok_or_else(|| AlarmError::NotFound(format!("alarm {}", alarm_id)))
    }

    pub async fn list(&self, query: &AlarmQuery) -> Result<Vec<AlarmRecord>, AlarmError> {
        Ok(self.alarm_store.list_alarms(query).await?)
    }

    /// 变更告警状态。相同状态视为成功且不写入。
    pub async fn transition(
        &self,
        alarm_id: &str,
        to: AlarmStatus,
        actor: &str,
    ) -> Result<AlarmRecord, AlarmError> {
        let mut attempt = 0u32;
        loop {
            let current = self.get(alarm_id).await?;
            let from = current.status;
            if let Err(err) = from.transition_to(to) {
                record_alarm_transition_rejected();
                warn!(
                    target: "greenhouse.alarm",
                    alarm_id = %alarm_id,
                    from = %from,
                    to = %to,
                    actor = %actor,
                    "alarm_transition_rejected"
                );
                return Err(AlarmError::InvalidTransition(err));
            }
            if from == to {
                return Ok(current);
            }

            let now_ms = self.clock.now_ms();
            if let Some(updated) = self
                .alarm_store
                .transition_status(alarm_id, from, to, now_ms)
                .await?
            {
                record_alarm_transition();
                info!(
                    target: "greenhouse.alarm",
                    alarm_id = %alarm_id,
                    from = %from,
                    to = %to,
                    actor = %actor,
                    "alarm_status_changed"
                );
                self.audit(actor, &updated, from, now_ms).await;
                return Ok(updated);
            }

            record_concurrency_conflict();
            attempt += 1;
            if attempt > self.max_retries {
                warn!(
                    target: "greenhouse.alarm",
                    alarm_id = %alarm_id,
                    to = %to,
                    "alarm_transition_conflict"
                );
                return Err(AlarmError::Conflict(format!(
                    "alarm {} was modified concurrently",
                    alarm_id
                )));
            }
        }
    }

    async fn audit(&self, actor: &str, alarm: &AlarmRecord, from: AlarmStatus, ts_ms: i64) {
        let audit = AuditLogRecord::new(
            actor,
            "ALARM.STATUS.UPDATE",
            format!("alarm:{}", alarm.alarm_id),
            alarm.status.as_str(),
            ts_ms,
        )
        .with_detail(format!("{} -> {}", from, alarm.status));
        // 审计失败不影响已生效的状态变更
        if let Err(err) = self.audit_store.append_audit_log(audit).await {
            warn!(
                target: "greenhouse.alarm",
                alarm_id = %alarm.alarm_id,
                error = %err,
                "audit_write_failed"
            );
        }
    }
}
