//! 告警内存存储实现
//!
//! 功能：
//! - 按状态 / 严重级别 / 设备过滤
//! - 按时间 / 严重级别 / 状态排序
//! - 条件状态流转（当前状态不匹配时不写入）

use crate::error::StorageError;
use crate::models::{AlarmQuery, AlarmRecord, AlarmSortField, SortOrder};
use crate::traits::AlarmStore;
use domain::AlarmStatus;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

/// 告警内存存储
pub struct InMemoryAlarmStore {
    alarms: RwLock<HashMap<String, AlarmRecord>>,
}

impl InMemoryAlarmStore {
    pub fn new() -> Self {
        Self {
            alarms: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAlarmStore {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(a: &AlarmRecord, b: &AlarmRecord, sort_by: AlarmSortField) -> Ordering {
    let primary = match sort_by {
        AlarmSortField::Timestamp => a.ts_ms.cmp(&b.ts_ms),
        AlarmSortField::Severity => a.severity.rank().cmp(&b.severity.rank()),
        AlarmSortField::Status => a.status.rank().cmp(&b.status.rank()),
    };
    // 次级排序固定为时间戳，保证结果稳定
    primary
        .then(a.ts_ms.cmp(&b.ts_ms))
        .then(a.alarm_id.cmp(&b.alarm_id))
}

#[async_trait::async_trait]
impl AlarmStore for InMemoryAlarmStore {
    async fn create_alarm(&self, record: AlarmRecord) -> Result<AlarmRecord, StorageError> {
        let mut alarms = self
            .alarms
            .write()
            .map_err(|_| StorageError::poisoned("alarm"))?;
        if alarms.contains_key(&record.alarm_id) {
            return Err(StorageError::new("alarm already exists"));
        }
        alarms.insert(record.alarm_id.clone(), record.clone());
        Ok(record)
    }

    async fn find_alarm(&self, alarm_id: &str) -> Result<Option<AlarmRecord>, StorageError> {
        let item = self
            .alarms
            .read()
            .ok()
            .and_then(|map| map.get(alarm_id).cloned());
        Ok(item)
    }

    async fn list_alarms(&self, query: &AlarmQuery) -> Result<Vec<AlarmRecord>, StorageError> {
        let alarms = self
            .alarms
            .read()
            .map_err(|_| StorageError::poisoned("alarm"))?;
        let mut items: Vec<AlarmRecord> = alarms
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort_by);
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        if let Some(limit) = query.limit {
            let limit = limit.max(0) as usize;
            if limit > 0 && items.len() > limit {
                items.truncate(limit);
            }
        }
        Ok(items)
    }

    async fn list_open_alarms_for_rule(
        &self,
        rule_id: &str,
    ) -> Result<Vec<AlarmRecord>, StorageError> {
        let alarms = self
            .alarms
            .read()
            .map_err(|_| StorageError::poisoned("alarm"))?;
        let mut items: Vec<AlarmRecord> = alarms
            .values()
            .filter(|item| {
                item.status.is_open() && item.triggered_by_rule_id.as_deref() == Some(rule_id)
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| a.ts_ms.cmp(&b.ts_ms));
        Ok(items)
    }

    async fn transition_status(
        &self,
        alarm_id: &str,
        from: AlarmStatus,
        to: AlarmStatus,
        ts_ms: i64,
    ) -> Result<Option<AlarmRecord>, StorageError> {
        let mut alarms = self
            .alarms
            .write()
            .map_err(|_| StorageError::poisoned("alarm"))?;
        let Some(record) = alarms.get_mut(alarm_id) else {
            return Ok(None);
        };
        if record.status != from {
            return Ok(None);
        }
        record.status = to;
        match to {
            AlarmStatus::Acknowledged => record.acknowledged_at_ms = Some(ts_ms),
            AlarmStatus::Cleared => record.cleared_at_ms = Some(ts_ms),
            AlarmStatus::Active => {}
        }
        record.updated_at_ms = ts_ms;
        Ok(Some(record.clone()))
    }
}
