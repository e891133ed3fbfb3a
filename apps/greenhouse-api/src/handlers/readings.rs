//! 传感器读数 handlers
//!
//! - POST /readings - 写入读数并立即评估告警规则
//! - GET /readings - 最近的读数（`?limit=`，默认 100）
//! - GET /readings/latest - 最新读数

use crate::AppState;
use crate::utils::normalize_optional;
use crate::utils::response::{
    alarm_error, bad_request_error, evaluation_to_dto, not_found_error, ok, reading_to_dto,
    storage_error,
};
use api_contract::{CreateReadingRequest, ReadingDto};
use axum::{
    Json,
    extract::{Query, State},
    response::Response,
};
use domain::{SensorMetric, SensorReading};
use tracing::info;

#[derive(Debug, serde::Deserialize)]
pub struct ReadingListQuery {
    limit: Option<i64>,
}

/// 写入读数
///
/// 读数落库后对所有设备的启用规则评估一次，返回新产生的告警、
/// 被冷却抑制的规则数以及单条规则的错误。
pub async fn create_reading(
    State(state): State<AppState>,
    Json(req): Json<CreateReadingRequest>,
) -> Response {
    let reading_id = match normalize_optional(req.reading_id, "readingId") {
        Ok(value) => value.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        Err(response) => return response,
    };
    let ts_ms = req.ts_ms.unwrap_or_else(|| state.clock.now_ms());
    if ts_ms < 0 {
        return bad_request_error("tsMs must not be negative");
    }
    let mut reading = SensorReading::new(reading_id, ts_ms);
    for (name, value) in req.metrics {
        let metric = match name.parse::<SensorMetric>() {
            Ok(metric) => metric,
            Err(err) => return bad_request_error(err.to_string()),
        };
        // null 表示传感器离线
        if let Some(value) = value {
            reading = reading.with_metric(metric, value);
        }
    }

    let reading = match state.stores.readings.insert_reading(reading).await {
        Ok(reading) => reading,
        Err(err) => return storage_error(err),
    };
    info!(
        target: "greenhouse.api",
        reading_id = %reading.reading_id,
        ts_ms = reading.ts_ms,
        metrics = reading.metrics.len(),
        "reading_received"
    );
    match state.evaluator.evaluate_reading(&reading).await {
        Ok(outcome) => ok(evaluation_to_dto(reading, outcome)),
        Err(err) => alarm_error(err),
    }
}

/// 最近的读数
pub async fn list_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingListQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(100).max(0);
    match state.stores.readings.list_readings(limit).await {
        Ok(items) => {
            let data: Vec<ReadingDto> = items.into_iter().map(reading_to_dto).collect();
            ok(data)
        }
        Err(err) => storage_error(err),
    }
}

/// 最新读数
pub async fn get_latest_reading(State(state): State<AppState>) -> Response {
    match state.stores.readings.latest_reading().await {
        Ok(Some(reading)) => ok(reading_to_dto(reading)),
        Ok(None) => not_found_error("no sensor readings"),
        Err(err) => storage_error(err),
    }
}
