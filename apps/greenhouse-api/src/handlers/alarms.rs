//! 告警 handlers
//!
//! - GET /alarms - 列出告警（`status` / `severity` / `deviceId` 过滤，
//!   `sortBy` = timestamp | severity | status，`order` = asc | desc）
//! - GET /alarms/{id} - 告警详情
//! - PUT /alarms/{id}/status - 确认 / 清除告警

use crate::AppState;
use crate::middleware::Actor;
use crate::utils::{parse_field, parse_optional};
use crate::utils::response::{alarm_error, alarm_to_dto, bad_request_error, ok};
use api_contract::{AlarmDto, AlarmListQuery, UpdateAlarmStatusRequest};
use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    response::Response,
};
use domain::{AlarmSeverity, AlarmStatus};
use greenhouse_storage::{AlarmQuery, AlarmSortField, SortOrder};

#[derive(serde::Deserialize)]
pub struct AlarmPath {
    alarm_id: String,
}

/// 列出告警
pub async fn list_alarms(
    State(state): State<AppState>,
    Query(query): Query<AlarmListQuery>,
) -> Response {
    let query = match build_alarm_query(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    match state.lifecycle.list(&query).await {
        Ok(items) => {
            let data: Vec<AlarmDto> = items.into_iter().map(alarm_to_dto).collect();
            ok(data)
        }
        Err(err) => alarm_error(err),
    }
}

/// 告警详情
pub async fn get_alarm(State(state): State<AppState>, Path(path): Path<AlarmPath>) -> Response {
    match state.lifecycle.get(&path.alarm_id).await {
        Ok(alarm) => ok(alarm_to_dto(alarm)),
        Err(err) => alarm_error(err),
    }
}

/// 更新告警状态
///
/// 合法流转：active → acknowledged → cleared，active → cleared；
/// 重复当前状态视为成功。其余返回 `ALARM.INVALID_TRANSITION`。
pub async fn update_alarm_status(
    State(state): State<AppState>,
    Path(path): Path<AlarmPath>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<UpdateAlarmStatusRequest>,
) -> Response {
    let status: AlarmStatus = match parse_field(&req.status, "status") {
        Ok(status) => status,
        Err(response) => return response,
    };
    match state
        .lifecycle
        .transition(&path.alarm_id, status, actor.as_str())
        .await
    {
        Ok(alarm) => ok(alarm_to_dto(alarm)),
        Err(err) => alarm_error(err),
    }
}

fn build_alarm_query(query: AlarmListQuery) -> Result<AlarmQuery, Response> {
    let status = parse_optional::<AlarmStatus>(query.status.as_deref(), "status")?;
    let severity = parse_optional::<AlarmSeverity>(query.severity.as_deref(), "severity")?;
    let sort_by = match query.sort_by.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("timestamp") => AlarmSortField::Timestamp,
        Some("severity") => AlarmSortField::Severity,
        Some("status") => AlarmSortField::Status,
        Some(other) => return Err(bad_request_error(format!("invalid sortBy: {other}"))),
    };
    let order = match query.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("desc") => SortOrder::Desc,
        Some("asc") => SortOrder::Asc,
        Some(other) => return Err(bad_request_error(format!("invalid order: {other}"))),
    };
    Ok(AlarmQuery {
        status,
        severity,
        device_id: query.device_id.filter(|value| !value.trim().is_empty()),
        sort_by,
        order,
        limit: query.limit.map(|limit| limit.max(0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_query_defaults_to_newest_first() {
        let query = build_alarm_query(AlarmListQuery::default()).expect("query");
        assert_eq!(query.sort_by, AlarmSortField::Timestamp);
        assert_eq!(query.order, SortOrder::Desc);
        assert!(query.status.is_none());
    }

    #[test]
    fn alarm_query_parses_filters() {
        let query = build_alarm_query(AlarmListQuery {
            status: Some("acknowledged".to_string()),
            severity: Some("CRITICAL".to_string()),
            sort_by: Some("Severity".to_string()),
            order: Some("asc".to_string()),
            ..AlarmListQuery::default()
        })
        .expect("query");
        assert_eq!(query.status, Some(AlarmStatus::Acknowledged));
        assert_eq!(query.severity, Some(AlarmSeverity::Critical));
        assert_eq!(query.sort_by, AlarmSortField::Severity);
        assert_eq!(query.order, SortOrder::Asc);
    }

    #[test]
    fn alarm_query_rejects_unknown_values() {
        assert!(
            build_alarm_query(AlarmListQuery {
                status: Some("resolved".to_string()),
                ..AlarmListQuery::default()
            })
            .is_err()
        );
        assert!(
            build_alarm_query(AlarmListQuery {
                sort_by: Some("name".to_string()),
                ..AlarmListQuery::default()
            })
            .is_err()
        );
    }
}
