//! 领域层错误：边界解析失败与非法状态流转。

use crate::alarm::AlarmStatus;

/// 领域错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("unknown sensor metric: {0}")]
    UnknownMetric(String),
    #[error("sensor metric is not numeric: {0}")]
    NonNumericMetric(String),
    #[error("unknown device type: {0}")]
    UnknownDeviceType(String),
    #[error("ambiguous device label: {0}")]
    AmbiguousDeviceLabel(String),
    #[error("unknown device purpose: {0}")]
    UnknownDevicePurpose(String),
    #[error("unknown device action: {0}")]
    UnknownAction(String),
    #[error("unknown alarm condition: {0}")]
    UnknownCondition(String),
    #[error("unknown alarm severity: {0}")]
    UnknownSeverity(String),
    #[error("unknown alarm status: {0}")]
    UnknownStatus(String),
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: AlarmStatus, to: AlarmStatus },
}
