//! 控制链路错误。

use crate::interlock::InterlockVerdict;
use domain::DeviceAction;
use greenhouse_storage::{DeviceRecord, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("device not found with control_id: {0}")]
    NotFound(String),
    #[error("device is disabled and cannot be controlled: {0}")]
    DeviceDisabled(String),
    #[error("invalid action {action} for device type {device_type}, valid actions are: {allowed}")]
    InvalidAction {
        action: String,
        device_type: String,
        allowed: String,
    },
    /// 联锁阻止了命令；携带当前设备与完整判定，便于调用方展示。
    #[error("safety interlock active: {reason}")]
    Interlock {
        reason: String,
        action: DeviceAction,
        device: Box<DeviceRecord>,
        verdict: InterlockVerdict,
    },
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
}

impl From<StorageError> for ControlError {
    fn from(err: StorageError) -> Self {
        ControlError::Storage(err.to_string())
    }
}
