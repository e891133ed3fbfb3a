//! 规则冷却状态内存存储实现

use crate::error::StorageError;
use crate::traits::CooldownStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// 规则冷却状态内存存储
///
/// compare-and-set 在同一把写锁内完成比较与写入。
pub struct InMemoryCooldownStore {
    last_fired: RwLock<HashMap<String, i64>>,
}

impl InMemoryCooldownStore {
    pub fn new() -> Self {
        Self {
            last_fired: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCooldownStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CooldownStore for InMemoryCooldownStore {
    async fn last_fired_at_ms(&self, rule_id: &str) -> Result<Option<i64>, StorageError> {
        let last_fired = self
            .last_fired
            .read()
            .map_err(|_| StorageError::poisoned("cooldown"))?;
        Ok(last_fired.get(rule_id).copied())
    }

    async fn compare_and_set(
        &self,
        rule_id: &str,
        expected: Option<i64>,
        next: Option<i64>,
    ) -> Result<bool, StorageError> {
        let mut last_fired = self
            .last_fired
            .write()
            .map_err(|_| StorageError::poisoned("cooldown"))?;
        if last_fired.get(rule_id).copied() != expected {
            return Ok(false);
        }
        match next {
            Some(ts_ms) => {
                last_fired.insert(rule_id.to_string(), ts_ms);
            }
            None => {
                last_fired.remove(rule_id);
            }
        }
        Ok(true)
    }
}
