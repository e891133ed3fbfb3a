//! 设备控制服务。
//!
//! 同一设备的命令在设备锁内串行执行："重新读取设备 → 校验 → 联锁 → 写入状态"。
//! 状态写入另外带有 `version` 条件，多进程并发时冲突重试，超过次数返回 `Conflict`。

use crate::error::ControlError;
use crate::interlock::{InterlockEngine, InterlockVerdict};
use domain::{Clock, DeviceAction};
use greenhouse_storage::{AuditLogRecord, AuditLogStore, DeviceRecord, DeviceStore, ReadingStore};
use greenhouse_telemetry::{
    record_concurrency_conflict, record_device_command_applied, record_device_command_rejected,
    record_interlock_block, record_interlock_check,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

/// 控制命令成功后的结果。
#[derive(Debug, Clone)]
pub struct ControlOutcome {
    pub device: DeviceRecord,
    pub action: DeviceAction,
    pub verdict: InterlockVerdict,
    pub message: String,
}

/// 设备列表中附带的联锁预览。
#[derive(Debug, Clone)]
pub struct DevicePreview {
    pub device: DeviceRecord,
    /// 预览使用的动作（阀门 OPEN，其余 ON）
    pub action: DeviceAction,
    pub interlock: InterlockVerdict,
}

pub struct DeviceControlService {
    device_store: Arc<dyn DeviceStore>,
    reading_store: Arc<dyn ReadingStore>,
    audit_store: Arc<dyn AuditLogStore>,
    engine: Arc<InterlockEngine>,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    max_retries: u32,
}

impl DeviceControlService {
    pub fn new(
        device_store: Arc<dyn DeviceStore>,
        reading_store: Arc<dyn ReadingStore>,
        audit_store: Arc<dyn AuditLogStore>,
        engine: Arc<InterlockEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            device_store,
            reading_store,
            audit_store,
            engine,
            clock,
            locks: Mutex::new(HashMap::new()),
            max_retries: 1,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 对 `control_id` 指定的设备执行控制动作。
    pub async fn control_device(
        &self,
        control_id: &str,
        action: DeviceAction,
        actor: &str,
    ) -> Result<ControlOutcome, ControlError> {
        let device = self
            .device_store
            .find_by_control_id(control_id)
            .await?
            .ok_or_else(|| ControlError::NotFound(control_id.to_string()))?;
        let _guard = self.lock_device(&device.device_id).await;

        let mut attempt = 0u32;
        loop {
            // 锁内重新读取，拿到最新的启用状态和版本
            let device = self
                .device_store
                .find_device(&device.device_id)
                .await?
                .ok_or_else(|| ControlError::NotFound(control_id.to_string()))?;
            if !device.is_enabled {
                record_device_command_rejected();
                warn!(
                    target: "greenhouse.control",
                    control_id = %control_id,
                    action = %action,
                    actor = %actor,
                    "device_command_disabled"
                );
                return Err(ControlError::DeviceDisabled(control_id.to_string()));
            }
            if !device.device_type.supports(action) {
                record_device_command_rejected();
                let allowed = device
                    .device_type
                    .allowed_actions()
                    .iter()
                    .map(DeviceAction::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(ControlError::InvalidAction {
                    action: action.to_string(),
                    device_type: device.device_type.to_string(),
                    allowed,
                });
            }

            let latest = self.reading_store.latest_reading().await?;
            let verdict = self.engine.check_interlock(&device, action, latest.as_ref());
            record_interlock_check();
            if verdict.blocked {
                record_interlock_block();
                record_device_command_rejected();
                let reason = verdict.reason.clone().unwrap_or_default();
                warn!(
                    target: "greenhouse.control",
                    control_id = %control_id,
                    device_type = %device.device_type,
                    purpose = %device.purpose,
                    action = %action,
                    actor = %actor,
                    reason = %reason,
                    "interlock_blocked"
                );
                self.audit(actor, &device, "blocked", reason.clone()).await;
                return Err(ControlError::Interlock {
                    reason,
                    action,
                    device: Box::new(device),
                    verdict,
                });
            }

            let status = action.resulting_status();
            let now_ms = self.clock.now_ms();
            if let Some(updated) = self
                .device_store
                .update_status(&device.device_id, device.version, status, now_ms)
                .await?
            {
                record_device_command_applied();
                info!(
                    target: "greenhouse.control",
                    control_id = %control_id,
                    device_id = %updated.device_id,
                    action = %action,
                    status = %updated.status,
                    version = updated.version,
                    actor = %actor,
                    "device_command_applied"
                );
                self.audit(actor, &updated, "success", format!("{} -> {}", action, status))
                    .await;
                let message = format!(
                    "Device {} ({}) {} command sent successfully",
                    updated.name, control_id, action
                );
                return Ok(ControlOutcome {
                    device: updated,
                    action,
                    verdict,
                    message,
                });
            }

            record_concurrency_conflict();
            attempt += 1;
            if attempt > self.max_retries {
                warn!(
                    target: "greenhouse.control",
                    control_id = %control_id,
                    action = %action,
                    "device_command_conflict"
                );
                return Err(ControlError::Conflict(format!(
                    "device {} was modified concurrently",
                    control_id
                )));
            }
        }
    }

    /// 用最新读数预览每个设备默认动作的联锁判定。
    pub async fn preview_interlocks(&self) -> Result<Vec<DevicePreview>, ControlError> {
        let devices = self.device_store.list_devices().await?;
        let latest = self.reading_store.latest_reading().await?;
        Ok(devices
            .into_iter()
            .map(|device| {
                let action = device.device_type.default_action();
                let interlock = self.engine.check_interlock(&device, action, latest.as_ref());
                DevicePreview {
                    device,
                    action,
                    interlock,
                }
            })
            .collect())
    }

    /// 设备删除后释放其设备锁。
    pub fn forget_device(&self, device_id: &str) {
        if let Ok(mut locks) = self.locks.lock() {
            locks.remove(device_id);
        }
    }

    async fn lock_device(&self, device_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(device_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    async fn audit(&self, actor: &str, device: &DeviceRecord, result: &str, detail: String) {
        let audit = AuditLogRecord::new(
            actor,
            "DEVICE.CONTROL",
            format!("device:{}", device.control_id),
            result,
            self.clock.now_ms(),
        )
        .with_detail(detail);
        if let Err(err) = self.audit_store.append_audit_log(audit).await {
            warn!(
                target: "greenhouse.control",
                control_id = %device.control_id,
                error = %err,
                "audit_write_failed"
            );
        }
    }
}
