//! 审计日志内存实现
//!
//! 只追加。超过 `capacity` 时丢弃最早的记录，避免长时间运行的演示进程无限增长。

use crate::error::StorageError;
use crate::models::{AuditLogRecord, AuditQuery};
use crate::traits::AuditLogStore;
use std::collections::VecDeque;
use std::sync::RwLock;

const DEFAULT_CAPACITY: usize = 10_000;

pub struct InMemoryAuditLogStore {
    entries: RwLock<VecDeque<AuditLogRecord>>,
    capacity: usize,
}

impl InMemoryAuditLogStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryAuditLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuditLogStore for InMemoryAuditLogStore {
    async fn append_audit_log(&self, record: AuditLogRecord) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::poisoned("audit"))?;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
        Ok(())
    }

    async fn list_audit_logs(&self, query: &AuditQuery) -> Result<Vec<AuditLogRecord>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::poisoned("audit"))?;
        // 写入倒序后稳定排序，同一时间戳保持后写在前
        let mut matched: Vec<AuditLogRecord> = entries
            .iter()
            .rev()
            .filter(|entry| {
                query
                    .resource
                    .as_deref()
                    .is_none_or(|resource| entry.resource == resource)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
        matched.truncate(query.limit);
        Ok(matched)
    }
}
