//! 存储层错误类型
//!
//! 所有后端错误都折叠成 `StorageError`，上层只关心 `kind`：
//! 后端不可用、记录损坏、或进程内锁中毒。

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// SQL / Redis 执行失败，或写入被约束拒绝
    Backend,
    /// 库中数据无法解析成领域类型
    Corrupt,
    /// 内存存储的锁中毒
    Poisoned,
}

#[derive(Debug)]
pub struct StorageError {
    kind: StorageErrorKind,
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: StorageErrorKind::Backend,
            message: message.into(),
        }
    }

    pub fn corrupt(what: &str, detail: impl fmt::Display) -> Self {
        Self {
            kind: StorageErrorKind::Corrupt,
            message: format!("corrupt {what}: {detail}"),
        }
    }

    pub fn poisoned(store: &str) -> Self {
        Self {
            kind: StorageErrorKind::Poisoned,
            message: format!("{store} lock poisoned"),
        }
    }

    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::corrupt("row", err)
            }
            other => Self::new(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        Self::new(format!("redis: {err}"))
    }
}

impl From<domain::DomainError> for StorageError {
    fn from(err: domain::DomainError) -> Self {
        Self::corrupt("record", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_corrupt_records() {
        let err = StorageError::from(domain::DomainError::UnknownMetric("x".to_string()));
        assert_eq!(err.kind(), StorageErrorKind::Corrupt);
        assert!(err.message().starts_with("corrupt record: "));
    }

    #[test]
    fn poisoned_lock_names_the_store() {
        let err = StorageError::poisoned("device");
        assert_eq!(err.kind(), StorageErrorKind::Poisoned);
        assert_eq!(err.to_string(), "device lock poisoned");
    }
}
