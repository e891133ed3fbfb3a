//! 健康检查与计数指标快照。
//!
//! - GET /health
//! - GET /metrics

use crate::utils::response::ok;
use axum::response::Response;
use greenhouse_telemetry::metrics;

pub async fn health() -> Response {
    ok(serde_json::json!({ "ok": true }))
}

pub async fn get_metrics() -> Response {
    ok(metrics().snapshot())
}
