//! 设备 handlers
//!
//! - GET /devices - 列出设备，附带默认动作（阀门 OPEN，其余 ON）的联锁预览
//! - POST /devices - 创建设备（结构化类型 / 用途，或旧式标签）
//! - GET /devices/{id} - 设备详情
//! - PUT /devices/{id} - 更新名称 / 启用标记
//! - DELETE /devices/{id} - 删除设备（被告警规则引用时拒绝）
//! - POST /control_device/{control_id} - 控制设备

use crate::AppState;
use crate::middleware::Actor;
use crate::utils::response::{
    bad_request_error, conflict_error, control_error, device_to_dto, interlock_to_dto,
    not_found_error, ok, storage_error,
};
use crate::utils::{normalize_optional, normalize_required, parse_field, parse_optional};
use api_contract::{
    ControlDeviceDto, ControlDeviceRequest, CreateDeviceRequest, DeviceDto, UpdateDeviceRequest,
};
use axum::{
    Json,
    extract::{Extension, Path, State},
    response::Response,
};
use domain::{DeviceAction, DeviceClass, DevicePurpose, DeviceType};
use greenhouse_storage::{DEVICE_STATUS_UNKNOWN, DeviceRecord, DeviceUpdate};
use tracing::info;

#[derive(serde::Deserialize)]
pub struct DevicePath {
    device_id: String,
}

#[derive(serde::Deserialize)]
pub struct ControlPath {
    control_id: String,
}

/// 列出设备（含联锁预览）
pub async fn list_devices(State(state): State<AppState>) -> Response {
    match state.control.preview_interlocks().await {
        Ok(previews) => {
            let data: Vec<DeviceDto> = previews
                .into_iter()
                .map(|preview| {
                    let mut dto = device_to_dto(preview.device);
                    dto.interlock = Some(interlock_to_dto(preview.action, preview.interlock));
                    dto
                })
                .collect();
            ok(data)
        }
        Err(err) => control_error(err),
    }
}

/// 设备详情
pub async fn get_device(State(state): State<AppState>, Path(path): Path<DevicePath>) -> Response {
    match state.stores.devices.find_device(&path.device_id).await {
        Ok(Some(device)) => ok(device_to_dto(device)),
        Ok(None) => not_found_error(format!("device not found: {}", path.device_id)),
        Err(err) => storage_error(err),
    }
}

/// 创建设备
///
/// 优先使用 `deviceType` / `purpose`；只给出 `label` 时按旧式标签解析，
/// 标签中同时出现两种设备类型会被拒绝。
pub async fn create_device(
    State(state): State<AppState>,
    Json(req): Json<CreateDeviceRequest>,
) -> Response {
    let control_id = match normalize_required(req.control_id, "controlId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let name = match normalize_required(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let class = match resolve_class(
        req.device_type.as_deref(),
        req.purpose.as_deref(),
        req.label.as_deref(),
    ) {
        Ok(class) => class,
        Err(response) => return response,
    };
    match state.stores.devices.find_by_control_id(&control_id).await {
        Ok(Some(_)) => return conflict_error(format!("control_id already exists: {control_id}")),
        Ok(None) => {}
        Err(err) => return storage_error(err),
    }

    let record = DeviceRecord {
        device_id: uuid::Uuid::new_v4().to_string(),
        control_id,
        name,
        device_type: class.device_type,
        purpose: class.purpose,
        status: DEVICE_STATUS_UNKNOWN.to_string(),
        is_enabled: req.is_enabled.unwrap_or(true),
        last_status_update_ms: None,
        version: 0,
    };
    match state.stores.devices.create_device(record).await {
        Ok(device) => {
            info!(
                target: "greenhouse.api",
                device_id = %device.device_id,
                control_id = %device.control_id,
                device_type = %device.device_type,
                purpose = %device.purpose,
                "device_created"
            );
            ok(device_to_dto(device))
        }
        Err(err) => storage_error(err),
    }
}

/// 更新设备
pub async fn update_device(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    Json(req): Json<UpdateDeviceRequest>,
) -> Response {
    let name = match normalize_optional(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let update = DeviceUpdate {
        name,
        is_enabled: req.is_enabled,
    };
    match state
        .stores
        .devices
        .update_device(&path.device_id, update)
        .await
    {
        Ok(Some(device)) => ok(device_to_dto(device)),
        Ok(None) => not_found_error(format!("device not found: {}", path.device_id)),
        Err(err) => storage_error(err),
    }
}

/// 删除设备
pub async fn delete_device(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
) -> Response {
    match state
        .stores
        .rules
        .count_rules_for_device(&path.device_id)
        .await
    {
        Ok(0) => {}
        Ok(count) => {
            return conflict_error(format!(
                "device {} is referenced by {} alarm rule(s)",
                path.device_id, count
            ));
        }
        Err(err) => return storage_error(err),
    }
    match state.stores.devices.delete_device(&path.device_id).await {
        Ok(true) => {
            state.control.forget_device(&path.device_id);
            ok(serde_json::json!({ "deleted": path.device_id }))
        }
        Ok(false) => not_found_error(format!("device not found: {}", path.device_id)),
        Err(err) => storage_error(err),
    }
}

/// 控制设备
///
/// 设备停用返回 `CONTROL.DEVICE_DISABLED`，动作与设备类型不符返回 400，
/// 联锁阻止返回 `CONTROL.INTERLOCK`（`data` 中附带设备与判定）。
pub async fn control_device(
    State(state): State<AppState>,
    Path(path): Path<ControlPath>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<ControlDeviceRequest>,
) -> Response {
    let action: DeviceAction = match parse_field(&req.action, "action") {
        Ok(action) => action,
        Err(response) => return response,
    };
    match state
        .control
        .control_device(&path.control_id, action, actor.as_str())
        .await
    {
        Ok(outcome) => ok(ControlDeviceDto {
            message: outcome.message,
            device: device_to_dto(outcome.device),
            interlock: interlock_to_dto(outcome.action, outcome.verdict),
        }),
        Err(err) => control_error(err),
    }
}

fn resolve_class(
    device_type: Option<&str>,
    purpose: Option<&str>,
    label: Option<&str>,
) -> Result<DeviceClass, Response> {
    match (device_type, label) {
        (Some(device_type), _) => {
            let device_type: DeviceType = parse_field(device_type, "deviceType")?;
            let purpose =
                parse_optional::<DevicePurpose>(purpose, "purpose")?.unwrap_or_default();
            Ok(DeviceClass::new(device_type, purpose))
        }
        (None, Some(label)) => DeviceClass::from_label(label)
            .map_err(|err| bad_request_error(format!("invalid label: {err}"))),
        (None, None) => Err(bad_request_error("deviceType or label required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_type_wins_over_label() {
        let class = resolve_class(Some("valve"), Some("drain"), Some("PUMP water"))
            .expect("class");
        assert_eq!(class, DeviceClass::new(DeviceType::Valve, DevicePurpose::Drain));
    }

    #[test]
    fn legacy_label_is_parsed() {
        let class = resolve_class(None, None, Some("PUMP water main")).expect("class");
        assert_eq!(class, DeviceClass::new(DeviceType::Pump, DevicePurpose::Water));
    }

    #[test]
    fn ambiguous_or_missing_class_is_rejected() {
        assert!(resolve_class(None, None, Some("VALVE_PUMP")).is_err());
        assert!(resolve_class(None, None, None).is_err());
        assert!(resolve_class(Some("boiler"), None, None).is_err());
    }
}
