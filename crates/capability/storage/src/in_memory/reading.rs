//! 传感器读数内存存储实现

use crate::error::StorageError;
use crate::traits::ReadingStore;
use crate::validation::ensure_non_empty;
use domain::SensorReading;
use std::sync::RwLock;

/// 传感器读数内存存储
///
/// 按写入顺序保存；查询时按时间戳排序。
pub struct InMemoryReadingStore {
    readings: RwLock<Vec<SensorReading>>,
}

impl InMemoryReadingStore {
    pub fn new() -> Self {
        Self {
            readings: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn insert_reading(&self, reading: SensorReading) -> Result<SensorReading, StorageError> {
        ensure_non_empty("reading_id", &reading.reading_id)?;
        let mut readings = self
            .readings
            .write()
            .map_err(|_| StorageError::poisoned("reading"))?;
        if readings
            .iter()
            .any(|item| item.reading_id == reading.reading_id)
        {
            return Err(StorageError::new("reading already exists"));
        }
        readings.push(reading.clone());
        Ok(reading)
    }

    async fn latest_reading(&self) -> Result<Option<SensorReading>, StorageError> {
        let readings = self
            .readings
            .read()
            .map_err(|_| StorageError::poisoned("reading"))?;
        // 时间戳相同时取后写入的那条
        let latest = readings
            .iter()
            .enumerate()
            .max_by_key(|(index, item)| (item.ts_ms, *index))
            .map(|(_, item)| item.clone());
        Ok(latest)
    }

    async fn list_readings(&self, limit: i64) -> Result<Vec<SensorReading>, StorageError> {
        let limit = limit.max(0) as usize;
        let readings = self
            .readings
            .read()
            .map_err(|_| StorageError::poisoned("reading"))?;
        let mut items: Vec<SensorReading> = readings.iter().rev().cloned().collect();
        items.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
        if limit > 0 && items.len() > limit {
            items.truncate(limit);
        }
        Ok(items)
    }
}
