//! 告警能力错误。

use domain::DomainError;
use greenhouse_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    InvalidTransition(DomainError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error in rule {rule_id}: {message}")]
    Configuration { rule_id: String, message: String },
    /// 条件写入在重试后仍然冲突（瞬时错误，调用方可重试）。
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
}

impl From<StorageError> for AlarmError {
    fn from(err: StorageError) -> Self {
        AlarmError::Storage(err.to_string())
    }
}
