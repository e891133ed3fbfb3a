//! 告警规则内存存储实现

use crate::error::StorageError;
use crate::models::{AlarmRuleRecord, AlarmRuleUpdate};
use crate::traits::AlarmRuleStore;
use crate::validation::{ensure_finite, ensure_non_empty};
use std::collections::HashMap;
use std::sync::RwLock;

/// 告警规则内存存储
pub struct InMemoryAlarmRuleStore {
    rules: RwLock<HashMap<String, AlarmRuleRecord>>,
}

impl InMemoryAlarmRuleStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAlarmRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted(mut items: Vec<AlarmRuleRecord>) -> Vec<AlarmRuleRecord> {
    items.sort_by(|a, b| a.name.cmp(&b.name).then(a.rule_id.cmp(&b.rule_id)));
    items
}

#[async_trait::async_trait]
impl AlarmRuleStore for InMemoryAlarmRuleStore {
    async fn list_rules(&self) -> Result<Vec<AlarmRuleRecord>, StorageError> {
        let items = self
            .rules
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        Ok(sorted(items))
    }

    async fn list_active_rules_for_device(
        &self,
        device_id: &str,
    ) -> Result<Vec<AlarmRuleRecord>, StorageError> {
        let items = self
            .rules
            .read()
            .map(|map| {
                map.values()
                    .filter(|item| item.is_active && item.device_id == device_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(sorted(items))
    }

    async fn find_rule(&self, rule_id: &str) -> Result<Option<AlarmRuleRecord>, StorageError> {
        let item = self
            .rules
            .read()
            .ok()
            .and_then(|map| map.get(rule_id).cloned());
        Ok(item)
    }

    async fn create_rule(&self, record: AlarmRuleRecord) -> Result<AlarmRuleRecord, StorageError> {
        ensure_non_empty("name", &record.name)?;
        ensure_finite("threshold_value", record.threshold_value)?;
        let mut rules = self
            .rules
            .write()
            .map_err(|_| StorageError::poisoned("alarm rule"))?;
        if rules.contains_key(&record.rule_id) {
            return Err(StorageError::new("rule already exists"));
        }
        rules.insert(record.rule_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_rule(
        &self,
        rule_id: &str,
        update: AlarmRuleUpdate,
    ) -> Result<Option<AlarmRuleRecord>, StorageError> {
        if let Some(threshold_value) = update.threshold_value {
            ensure_finite("threshold_value", threshold_value)?;
        }
        let mut rules = self
            .rules
            .write()
            .map_err(|_| StorageError::poisoned("alarm rule"))?;
        let Some(record) = rules.get_mut(rule_id) else {
            return Ok(None);
        };
        record.apply(update);
        Ok(Some(record.clone()))
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<bool, StorageError> {
        let mut rules = self
            .rules
            .write()
            .map_err(|_| StorageError::poisoned("alarm rule"))?;
        Ok(rules.remove(rule_id).is_some())
    }

    async fn count_rules_for_device(&self, device_id: &str) -> Result<usize, StorageError> {
        let rules = self
            .rules
            .read()
            .map_err(|_| StorageError::poisoned("alarm rule"))?;
        Ok(rules
            .values()
            .filter(|item| item.device_id == device_id)
            .count())
    }
}
