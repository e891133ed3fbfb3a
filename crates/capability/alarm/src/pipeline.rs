//! 规则评估流水线。
//!
//! 每条读数：取设备的启用规则 → 解析指标 → 阈值判定 → 冷却判定 → 创建告警。
//! 单条规则的错误只影响该规则，单个设备的错误（如读取规则失败）只影响该设备，
//! 其余规则和设备照常评估；错误随结果一并返回。
//!
//! 同一规则的 "冷却判定 → 记录触发 → 创建告警" 在规则锁内串行执行，
//! 并由冷却存储的 compare-and-set 兜底跨进程并发。

use crate::cooldown::{CooldownTracker, FireDecision};
use crate::error::AlarmError;
use crate::lifecycle::{AlarmLifecycle, SYSTEM_ACTOR};
use crate::threshold::evaluate;
use domain::{AlarmStatus, SensorMetric, SensorReading};
use greenhouse_storage::{
    AlarmRecord, AlarmRuleRecord, AlarmRuleStore, AlarmStore, DeviceRecord, DeviceStore,
};
use greenhouse_telemetry::{
    record_alarm_auto_cleared, record_alarm_suppressed, record_evaluation_latency_ms,
    record_reading_evaluated, record_rule_config_error, record_rule_evaluated,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 流水线参数。
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// 指标存在且条件不再满足时，自动清除该规则未清除的告警
    pub auto_clear: bool,
}

/// 规则错误类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleErrorKind {
    /// 规则配置非法（如指标不存在），修正规则前每次都会失败
    Configuration,
    Storage,
    /// 并发冲突，下一条读数会重新评估
    Conflict,
}

/// 单条规则的评估错误。设备级错误的 `rule_id` 和 `rule_name` 为空。
#[derive(Debug, Clone, PartialEq)]
pub struct RuleError {
    pub device_id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub kind: RuleErrorKind,
    pub message: String,
}

impl RuleError {
    fn from_alarm_error(rule: &AlarmRuleRecord, err: AlarmError) -> Self {
        let kind = match err {
            AlarmError::Conflict(_) => RuleErrorKind::Conflict,
            AlarmError::Configuration { .. } | AlarmError::Validation(_) => {
                RuleErrorKind::Configuration
            }
            _ => RuleErrorKind::Storage,
        };
        Self {
            device_id: rule.device_id.clone(),
            rule_id: rule.rule_id.clone(),
            rule_name: rule.name.clone(),
            kind,
            message: err.to_string(),
        }
    }

    fn for_device(device: &DeviceRecord, err: AlarmError) -> Self {
        Self {
            device_id: device.device_id.clone(),
            rule_id: String::new(),
            rule_name: String::new(),
            kind: RuleErrorKind::Storage,
            message: err.to_string(),
        }
    }
}

/// 一次评估的结果。
#[derive(Debug, Clone, Default)]
pub struct EvaluationOutcome {
    /// 新创建的告警
    pub alarms: Vec<AlarmRecord>,
    pub errors: Vec<RuleError>,
    /// 被冷却抑制的规则数
    pub suppressed: usize,
    /// 自动清除的告警
    pub auto_cleared: Vec<AlarmRecord>,
}

impl EvaluationOutcome {
    fn merge(&mut self, other: EvaluationOutcome) {
        self.alarms.extend(other.alarms);
        self.errors.extend(other.errors);
        self.suppressed += other.suppressed;
        self.auto_cleared.extend(other.auto_cleared);
    }
}

enum RuleResult {
    Idle,
    Raised(AlarmRecord),
    Suppressed,
    Cleared(Vec<AlarmRecord>),
}

/// 规则评估器。
#[derive(Clone)]
pub struct RuleEvaluator {
    rule_store: Arc<dyn AlarmRuleStore>,
    device_store: Arc<dyn DeviceStore>,
    alarm_store: Arc<dyn AlarmStore>,
    cooldown: Arc<CooldownTracker>,
    lifecycle: AlarmLifecycle,
    config: PipelineConfig,
}

impl RuleEvaluator {
    pub fn new(
        rule_store: Arc<dyn AlarmRuleStore>,
        device_store: Arc<dyn DeviceStore>,
        alarm_store: Arc<dyn AlarmStore>,
        cooldown: Arc<CooldownTracker>,
        lifecycle: AlarmLifecycle,
        config: PipelineConfig,
    ) -> Self {
        Self {
            rule_store,
            device_store,
            alarm_store,
            cooldown,
            lifecycle,
            config,
        }
    }

    /// 对所有设备评估一条读数。
    pub async fn evaluate_reading(
        &self,
        reading: &SensorReading,
    ) -> Result<EvaluationOutcome, AlarmError> {
        let started_at = Instant::now();
        let devices = self.device_store.list_devices().await?;
        let mut outcome = EvaluationOutcome::default();
        for device in &devices {
            match self.evaluate_device(reading, device).await {
                Ok(device_outcome) => outcome.merge(device_outcome),
                Err(err) => {
                    warn!(
                        target: "greenhouse.alarm",
                        device_id = %device.device_id,
                        reading_id = %reading.reading_id,
                        error = %err,
                        "device_evaluation_failed"
                    );
                    outcome.errors.push(RuleError::for_device(device, err));
                }
            }
        }
        record_reading_evaluated();
        record_evaluation_latency_ms(started_at.elapsed().as_millis() as u64);
        info!(
            target: "greenhouse.alarm",
            reading_id = %reading.reading_id,
            ts_ms = reading.ts_ms,
            devices = devices.len(),
            alarms = outcome.alarms.len(),
            suppressed = outcome.suppressed,
            auto_cleared = outcome.auto_cleared.len(),
            errors = outcome.errors.len(),
            "reading_evaluated"
        );
        Ok(outcome)
    }

    /// 对单个设备评估一条读数。
    pub async fn on_new_reading(
        &self,
        reading: &SensorReading,
        device: &DeviceRecord,
    ) -> Result<EvaluationOutcome, AlarmError> {
        let started_at = Instant::now();
        let outcome = self.evaluate_device(reading, device).await?;
        record_reading_evaluated();
        record_evaluation_latency_ms(started_at.elapsed().as_millis() as u64);
        Ok(outcome)
    }

    async fn evaluate_device(
        &self,
        reading: &SensorReading,
        device: &DeviceRecord,
    ) -> Result<EvaluationOutcome, AlarmError> {
        let rules = self
            .rule_store
            .list_active_rules_for_device(&device.device_id)
            .await?;
        let mut outcome = EvaluationOutcome::default();
        for rule in &rules {
            let metric = match rule.sensor_metric.parse::<SensorMetric>() {
                Ok(metric) => metric,
                Err(err) => {
                    record_rule_config_error();
                    warn!(
                        target: "greenhouse.alarm",
                        rule_id = %rule.rule_id,
                        rule_name = %rule.name,
                        sensor_metric = %rule.sensor_metric,
                        error = %err,
                        "rule_config_error"
                    );
                    outcome.errors.push(RuleError::from_alarm_error(
                        rule,
                        AlarmError::Configuration {
                            rule_id: rule.rule_id.clone(),
                            message: err.to_string(),
                        },
                    ));
                    continue;
                }
            };
            match self.evaluate_rule(rule, metric, reading).await {
                Ok(RuleResult::Idle) => {}
                Ok(RuleResult::Raised(alarm)) => outcome.alarms.push(alarm),
                Ok(RuleResult::Suppressed) => outcome.suppressed += 1,
                Ok(RuleResult::Cleared(alarms)) => outcome.auto_cleared.extend(alarms),
                Err(err) => {
                    warn!(
                        target: "greenhouse.alarm",
                        rule_id = %rule.rule_id,
                        reading_id = %reading.reading_id,
                        error = %err,
                        "rule_evaluation_failed"
                    );
                    outcome.errors.push(RuleError::from_alarm_error(rule, err));
                }
            }
        }
        Ok(outcome)
    }

    async fn evaluate_rule(
        &self,
        rule: &AlarmRuleRecord,
        metric: SensorMetric,
        reading: &SensorReading,
    ) -> Result<RuleResult, AlarmError> {
        record_rule_evaluated();
        let value = reading.value(metric);
        let fires = evaluate(value, rule.condition, rule.threshold_value);
        if !fires {
            return match value {
                Some(_) if self.config.auto_clear => self.auto_clear(rule).await,
                _ => Ok(RuleResult::Idle),
            };
        }
        let Some(observed) = value else {
            return Ok(RuleResult::Idle);
        };

        let _guard = self.cooldown.lock_rule(&rule.rule_id).await;
        let previous = match self.cooldown.try_fire(rule, reading.ts_ms).await? {
            FireDecision::Suppressed { last_fired_at_ms } => {
                record_alarm_suppressed();
                debug!(
                    target: "greenhouse.alarm",
                    rule_id = %rule.rule_id,
                    reading_id = %reading.reading_id,
                    last_fired_at_ms = last_fired_at_ms,
                    "alarm_suppressed"
                );
                return Ok(RuleResult::Suppressed);
            }
            FireDecision::Fired { previous } => previous,
        };

        match self.lifecycle.raise(rule, metric, observed, reading).await {
            Ok(alarm) => Ok(RuleResult::Raised(alarm)),
            Err(err) => {
                // 告警未写入，撤销本次触发记录，下一条读数可以重新触发
                if let Err(rollback_err) = self
                    .cooldown
                    .rollback(&rule.rule_id, reading.ts_ms, previous)
                    .await
                {
                    warn!(
                        target: "greenhouse.alarm",
                        rule_id = %rule.rule_id,
                        error = %rollback_err,
                        "cooldown_rollback_failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn auto_clear(&self, rule: &AlarmRuleRecord) -> Result<RuleResult, AlarmError> {
        let _guard = self.cooldown.lock_rule(&rule.rule_id).await;
        let open = self
            .alarm_store
            .list_open_alarms_for_rule(&rule.rule_id)
            .await?;
        if open.is_empty() {
            return Ok(RuleResult::Idle);
        }
        let mut cleared = Vec::with_capacity(open.len());
        for alarm in open {
            match self
                .lifecycle
                .transition(&alarm.alarm_id, AlarmStatus::Cleared, SYSTEM_ACTOR)
                .await
            {
                Ok(updated) => {
                    record_alarm_auto_cleared();
                    cleared.push(updated);
                }
                Err(AlarmError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        if !cleared.is_empty() {
            info!(
                target: "greenhouse.alarm",
                rule_id = %rule.rule_id,
                cleared = cleared.len(),
                "alarms_auto_cleared"
            );
        }
        Ok(RuleResult::Cleared(cleared))
    }
}
