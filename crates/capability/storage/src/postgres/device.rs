//! Postgres 设备存储实现
//!
//! 设计要点：
//! - 状态写入带 `version` 条件，冲突时返回 `None`
//! - 设备类型 / 用途以文本存储，读取时解析

use crate::error::StorageError;
use crate::models::{DeviceRecord, DeviceUpdate};
use crate::traits::DeviceStore;
use crate::validation::ensure_non_empty;
use domain::{DevicePurpose, DeviceType};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const DEVICE_COLUMNS: &str = "device_id, control_id, name, device_type, purpose, status, \
     is_enabled, last_status_update_ms, version";

pub struct PgDeviceStore {
    pool: PgPool,
}

impl PgDeviceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn device_from_row(row: &PgRow) -> Result<DeviceRecord, StorageError> {
    let device_type: String = row.try_get("device_type")?;
    let purpose: String = row.try_get("purpose")?;
    Ok(DeviceRecord {
        device_id: row.try_get("device_id")?,
        control_id: row.try_get("control_id")?,
        name: row.try_get("name")?,
        device_type: device_type.parse::<DeviceType>()?,
        purpose: purpose.parse::<DevicePurpose>()?,
        status: row.try_get("status")?,
        is_enabled: row.try_get("is_enabled")?,
        last_status_update_ms: row.try_get("last_status_update_ms")?,
        version: row.try_get("version")?,
    })
}

#[async_trait::async_trait]
impl DeviceStore for PgDeviceStore {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "select {DEVICE_COLUMNS} from devices order by name, device_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(device_from_row).collect()
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "select {DEVICE_COLUMNS} from devices where device_id = $1"
        ))
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn find_by_control_id(
        &self,
        control_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "select {DEVICE_COLUMNS} from devices where control_id = $1"
        ))
        .bind(control_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        ensure_non_empty("control_id", &record.control_id)?;
        ensure_non_empty("name", &record.name)?;
        sqlx::query(
            "insert into devices \
             (device_id, control_id, name, device_type, purpose, status, is_enabled, \
              last_status_update_ms, version) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&record.device_id)
        .bind(&record.control_id)
        .bind(&record.name)
        .bind(record.device_type.as_str())
        .bind(record.purpose.as_str())
        .bind(&record.status)
        .bind(record.is_enabled)
        .bind(record.last_status_update_ms)
        .bind(record.version)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update_device(
        &self,
        device_id: &str,
        update: DeviceUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "update devices set \
             name = coalesce($2, name), \
             is_enabled = coalesce($3, is_enabled), \
             version = version + 1 \
             where device_id = $1 \
             returning {DEVICE_COLUMNS}"
        ))
        .bind(device_id)
        .bind(update.name)
        .bind(update.is_enabled)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn update_status(
        &self,
        device_id: &str,
        expected_version: i64,
        status: &str,
        ts_ms: i64,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "update devices set \
             status = $3, last_status_update_ms = $4, version = version + 1 \
             where device_id = $1 and version = $2 \
             returning {DEVICE_COLUMNS}"
        ))
        .bind(device_id)
        .bind(expected_version)
        .bind(status)
        .bind(ts_ms)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn delete_device(&self, device_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("delete from devices where device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
