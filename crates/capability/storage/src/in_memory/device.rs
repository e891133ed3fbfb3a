//! 设备内存存储实现
//!
//! 功能：
//! - 设备 CRUD 操作
//! - 控制标识唯一约束
//! - 带版本校验的状态写入

use crate::error::StorageError;
use crate::models::{DeviceRecord, DeviceUpdate};
use crate::traits::DeviceStore;
use crate::validation::ensure_non_empty;
use std::collections::HashMap;
use std::sync::RwLock;

/// 设备内存存储
///
/// 使用 RwLock + HashMap 提供线程安全的内存存储。
pub struct InMemoryDeviceStore {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl InMemoryDeviceStore {
    /// 创建新的设备存储
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let mut items: Vec<DeviceRecord> = self
            .devices
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.device_id.cmp(&b.device_id)));
        Ok(items)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let item = self
            .devices
            .read()
            .ok()
            .and_then(|map| map.get(device_id).cloned());
        Ok(item)
    }

    async fn find_by_control_id(
        &self,
        control_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let item = self.devices.read().ok().and_then(|map| {
            map.values()
                .find(|item| item.control_id == control_id)
                .cloned()
        });
        Ok(item)
    }

    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        ensure_non_empty("control_id", &record.control_id)?;
        ensure_non_empty("name", &record.name)?;
        let mut devices = self
            .devices
            .write()
            .map_err(|_| StorageError::poisoned("device"))?;
        if devices.contains_key(&record.device_id) {
            return Err(StorageError::new("device already exists"));
        }
        if devices
            .values()
            .any(|item| item.control_id == record.control_id)
        {
            return Err(StorageError::new("control_id already exists"));
        }
        devices.insert(record.device_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_device(
        &self,
        device_id: &str,
        update: DeviceUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let mut devices = self
            .devices
            .write()
            .map_err(|_| StorageError::poisoned("device"))?;
        let Some(record) = devices.get_mut(device_id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(is_enabled) = update.is_enabled {
            record.is_enabled = is_enabled;
        }
        record.version += 1;
        Ok(Some(record.clone()))
    }

    async fn update_status(
        &self,
        device_id: &str,
        expected_version: i64,
        status: &str,
        ts_ms: i64,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let mut devices = self
            .devices
            .write()
            .map_err(|_| StorageError::poisoned("device"))?;
        let Some(record) = devices.get_mut(device_id) else {
            return Ok(None);
        };
        if record.version != expected_version {
            return Ok(None);
        }
        record.status = status.to_string();
        record.last_status_update_ms = Some(ts_ms);
        record.version += 1;
        Ok(Some(record.clone()))
    }

    async fn delete_device(&self, device_id: &str) -> Result<bool, StorageError> {
        let mut devices = self
            .devices
            .write()
            .map_err(|_| StorageError::poisoned("device"))?;
        Ok(devices.remove(device_id).is_some())
    }
}
