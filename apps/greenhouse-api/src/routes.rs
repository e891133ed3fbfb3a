//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers：
//! - 健康检查与指标：/health, /metrics
//! - 读数：/readings/*
//! - 告警：/alarms/*
//! - 告警规则：/alarm_rules/*, /sensor_metrics
//! - 设备与控制：/devices/*, /control_device/{control_id}
//! - 审计：/audit_logs

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post, put},
};

/// 创建 API 路由
///
/// 返回包含所有 API 端点的 Router，由 `build_app` 同时挂载在 / 和 /api/ 下
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/readings", get(list_readings).post(create_reading))
        .route("/readings/latest", get(get_latest_reading))
        .route("/alarms", get(list_alarms))
        .route("/alarms/:alarm_id", get(get_alarm))
        .route("/alarms/:alarm_id/status", put(update_alarm_status))
        .route("/alarm_rules", get(list_alarm_rules).post(create_alarm_rule))
        .route(
            "/alarm_rules/:rule_id",
            get(get_alarm_rule)
                .put(update_alarm_rule)
                .delete(delete_alarm_rule),
        )
        .route("/sensor_metrics", get(list_sensor_metrics))
        .route("/devices", get(list_devices).post(create_device))
        .route(
            "/devices/:device_id",
            get(get_device).put(update_device).delete(delete_device),
        )
        .route("/control_device/:control_id", post(control_device))
        .route("/audit_logs", get(list_audit_logs))
}
