//! 告警规则 handlers
//!
//! - GET /alarm_rules - 列出规则
//! - POST /alarm_rules - 创建规则
//! - GET /alarm_rules/{id} - 规则详情
//! - PUT /alarm_rules/{id} - 更新规则
//! - DELETE /alarm_rules/{id} - 删除规则（同时清除冷却状态，历史告警保留）
//! - GET /sensor_metrics - 可用于规则的指标

use crate::AppState;
use crate::utils::response::{alarm_error, ok, rule_to_dto};
use crate::utils::{normalize_optional, normalize_required, parse_field, parse_optional};
use api_contract::{AlarmRuleDto, CreateAlarmRuleRequest, UpdateAlarmRuleRequest};
use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use domain::{AlarmCondition, AlarmSeverity, SensorMetric};
use greenhouse_alarm::NewAlarmRule;
use greenhouse_storage::AlarmRuleUpdate;

#[derive(serde::Deserialize)]
pub struct RulePath {
    rule_id: String,
}

/// 列出规则
pub async fn list_alarm_rules(State(state): State<AppState>) -> Response {
    match state.rules.list_rules().await {
        Ok(items) => {
            let data: Vec<AlarmRuleDto> = items.into_iter().map(rule_to_dto).collect();
            ok(data)
        }
        Err(err) => alarm_error(err),
    }
}

/// 规则详情
pub async fn get_alarm_rule(State(state): State<AppState>, Path(path): Path<RulePath>) -> Response {
    match state.rules.get_rule(&path.rule_id).await {
        Ok(rule) => ok(rule_to_dto(rule)),
        Err(err) => alarm_error(err),
    }
}

/// 创建规则
///
/// 设备必须存在，指标必须是已知的数值指标，阈值必须是有限值。
/// 未给出时：严重级别 WARNING、启用、冷却时间取配置默认值。
pub async fn create_alarm_rule(
    State(state): State<AppState>,
    Json(req): Json<CreateAlarmRuleRequest>,
) -> Response {
    let device_id = match normalize_required(req.device_id, "deviceId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let condition: AlarmCondition = match parse_field(&req.condition, "condition") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let severity = match parse_optional::<AlarmSeverity>(req.severity.as_deref(), "severity") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let input = NewAlarmRule {
        name: req.name,
        device_id,
        sensor_metric: req.sensor_metric,
        condition,
        threshold_value: req.threshold_value,
        severity,
        is_active: req.is_active,
        cooldown_period_seconds: req.cooldown_period_seconds,
    };
    match state.rules.create_rule(input).await {
        Ok(rule) => ok(rule_to_dto(rule)),
        Err(err) => alarm_error(err),
    }
}

/// 更新规则
pub async fn update_alarm_rule(
    State(state): State<AppState>,
    Path(path): Path<RulePath>,
    Json(req): Json<UpdateAlarmRuleRequest>,
) -> Response {
    let device_id = match normalize_optional(req.device_id, "deviceId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let condition = match parse_optional::<AlarmCondition>(req.condition.as_deref(), "condition")
    {
        Ok(value) => value,
        Err(response) => return response,
    };
    let severity = match parse_optional::<AlarmSeverity>(req.severity.as_deref(), "severity") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let update = AlarmRuleUpdate {
        name: req.name,
        device_id,
        sensor_metric: req.sensor_metric,
        condition,
        threshold_value: req.threshold_value,
        severity,
        is_active: req.is_active,
        cooldown_period_seconds: req.cooldown_period_seconds,
    };
    match state.rules.update_rule(&path.rule_id, update).await {
        Ok(rule) => ok(rule_to_dto(rule)),
        Err(err) => alarm_error(err),
    }
}

/// 删除规则
pub async fn delete_alarm_rule(
    State(state): State<AppState>,
    Path(path): Path<RulePath>,
) -> Response {
    match state.rules.delete_rule(&path.rule_id).await {
        Ok(()) => ok(serde_json::json!({ "deleted": path.rule_id })),
        Err(err) => alarm_error(err),
    }
}

/// 可用于规则的指标名
pub async fn list_sensor_metrics() -> Response {
    let data: Vec<&'static str> = SensorMetric::ALL
        .iter()
        .map(SensorMetric::as_str)
        .collect();
    ok(data)
}
