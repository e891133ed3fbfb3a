//! 审计日志 handlers
//!
//! - GET /audit_logs - 设备控制与告警状态变更记录（`?resource=&limit=`，默认 100）

use crate::AppState;
use crate::utils::response::{audit_log_to_dto, ok, storage_error};
use api_contract::{AuditLogDto, AuditLogQuery};
use axum::{
    extract::{Query, State},
    response::Response,
};
use greenhouse_storage::AuditQuery;

pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Response {
    let limit = usize::try_from(query.limit.unwrap_or(100)).unwrap_or(0);
    let query = match query.resource.filter(|value| !value.trim().is_empty()) {
        Some(resource) => AuditQuery::for_resource(resource.trim(), limit),
        None => AuditQuery::recent(limit),
    };
    match state.stores.audit.list_audit_logs(&query).await {
        Ok(items) => {
            let data: Vec<AuditLogDto> = items.into_iter().map(audit_log_to_dto).collect();
            ok(data)
        }
        Err(err) => storage_error(err),
    }
}
