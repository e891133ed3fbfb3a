//! Postgres 审计日志实现

use crate::error::StorageError;
use crate::models::{AuditLogRecord, AuditQuery};
use crate::traits::AuditLogStore;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

pub struct PgAuditLogStore {
    pool: PgPool,
}

impl PgAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn audit_from_row(row: &PgRow) -> Result<AuditLogRecord, StorageError> {
    Ok(AuditLogRecord {
        audit_id: row.try_get("audit_id")?,
        actor: row.try_get("actor")?,
        action: row.try_get("action")?,
        resource: row.try_get("resource")?,
        result: row.try_get("result")?,
        detail: row.try_get("detail")?,
        ts_ms: row.try_get("ts_ms")?,
    })
}

#[async_trait::async_trait]
impl AuditLogStore for PgAuditLogStore {
    async fn append_audit_log(&self, record: AuditLogRecord) -> Result<(), StorageError> {
        sqlx::query(
            "insert into audit_logs (audit_id, actor, action, resource, result, detail, ts_ms) \
             values ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.audit_id)
        .bind(record.actor)
        .bind(record.action)
        .bind(record.resource)
        .bind(record.result)
        .bind(record.detail)
        .bind(record.ts_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit_logs(&self, query: &AuditQuery) -> Result<Vec<AuditLogRecord>, StorageError> {
        // seq 列记录写入顺序，同一毫秒内后写的排在前面
        let rows = sqlx::query(
            "select audit_id, actor, action, resource, result, detail, ts_ms from audit_logs \
             where ($1::text is null or resource = $1) \
             order by ts_ms desc, seq desc limit $2",
        )
        .bind(query.resource.as_deref())
        .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }
}
