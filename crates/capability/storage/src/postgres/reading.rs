//! Postgres 传感器读数存储实现
//!
//! 指标以 jsonb 对象存储（键为 snake_case 指标名），新增指标无需改表。

use crate::error::StorageError;
use crate::traits::ReadingStore;
use crate::validation::ensure_non_empty;
use domain::{SensorMetric, SensorReading};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn reading_from_row(row: &PgRow) -> Result<SensorReading, StorageError> {
    let metrics: String = row.try_get("metrics")?;
    let metrics: BTreeMap<SensorMetric, f64> = serde_json::from_str(&metrics)
        .map_err(|err| StorageError::corrupt("reading metrics", err))?;
    Ok(SensorReading {
        reading_id: row.try_get("reading_id")?,
        ts_ms: row.try_get("ts_ms")?,
        metrics,
    })
}

#[async_trait::async_trait]
impl ReadingStore for PgReadingStore {
    async fn insert_reading(&self, reading: SensorReading) -> Result<SensorReading, StorageError> {
        ensure_non_empty("reading_id", &reading.reading_id)?;
        let metrics = serde_json::to_string(&reading.metrics)
            .map_err(|err| StorageError::new(err.to_string()))?;
        sqlx::query(
            "insert into sensor_readings (reading_id, ts_ms, metrics) values ($1, $2, $3::jsonb)",
        )
        .bind(&reading.reading_id)
        .bind(reading.ts_ms)
        .bind(metrics)
        .execute(&self.pool)
        .await?;
        Ok(reading)
    }

    async fn latest_reading(&self) -> Result<Option<SensorReading>, StorageError> {
        let row = sqlx::query(
            "select reading_id, ts_ms, metrics::text as metrics \
             from sensor_readings order by ts_ms desc limit 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(reading_from_row).transpose()
    }

    async fn list_readings(&self, limit: i64) -> Result<Vec<SensorReading>, StorageError> {
        let rows = sqlx::query(
            "select reading_id, ts_ms, metrics::text as metrics \
             from sensor_readings order by ts_ms desc limit $1",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(reading_from_row).collect()
    }
}
