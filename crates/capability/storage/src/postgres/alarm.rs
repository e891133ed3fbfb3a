//! Postgres 告警存储实现
//!
//! 设计要点：
//! - 过滤条件使用 `($n::text is null or col = $n)` 形式，保持单条参数化 SQL
//! - 排序字段来自封闭枚举，拼接前已映射为固定表达式
//! - 状态流转为单条条件 update，当前状态不匹配时不返回行

use crate::error::StorageError;
use crate::models::{AlarmQuery, AlarmRecord, AlarmSortField, SortOrder};
use crate::traits::AlarmStore;
use domain::{AlarmSeverity, AlarmStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const ALARM_COLUMNS: &str = "alarm_id, ts_ms, device_id, alarm_type, severity, status, details, \
     triggered_by_rule_id, acknowledged_at_ms, cleared_at_ms, updated_at_ms";

pub struct PgAlarmStore {
    pool: PgPool,
}

impl PgAlarmStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn alarm_from_row(row: &PgRow) -> Result<AlarmRecord, StorageError> {
    let severity: String = row.try_get("severity")?;
    let status: String = row.try_get("status")?;
    Ok(AlarmRecord {
        alarm_id: row.try_get("alarm_id")?,
        ts_ms: row.try_get("ts_ms")?,
        device_id: row.try_get("device_id")?,
        alarm_type: row.try_get("alarm_type")?,
        severity: severity.parse::<AlarmSeverity>()?,
        status: status.parse::<AlarmStatus>()?,
        details: row.try_get("details")?,
        triggered_by_rule_id: row.try_get("triggered_by_rule_id")?,
        acknowledged_at_ms: row.try_get("acknowledged_at_ms")?,
        cleared_at_ms: row.try_get("cleared_at_ms")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

fn order_clause(query: &AlarmQuery) -> String {
    let direction = match query.order {
        SortOrder::Asc => "asc",
        SortOrder::Desc => "desc",
    };
    let primary = match query.sort_by {
        AlarmSortField::Timestamp => "ts_ms",
        AlarmSortField::Severity => {
            "case severity when 'info' then 0 when 'warning' then 1 else 2 end"
        }
        AlarmSortField::Status => {
            "case status when 'active' then 0 when 'acknowledged' then 1 else 2 end"
        }
    };
    format!("order by {primary} {direction}, ts_ms {direction}, alarm_id {direction}")
}

#[async_trait::async_trait]
impl AlarmStore for PgAlarmStore {
    async fn create_alarm(&self, record: AlarmRecord) -> Result<AlarmRecord, StorageError> {
        sqlx::query(
            "insert into alarms \
             (alarm_id, ts_ms, device_id, alarm_type, severity, status, details, \
              triggered_by_rule_id, acknowledged_at_ms, cleared_at_ms, updated_at_ms) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&record.alarm_id)
        .bind(record.ts_ms)
        .bind(&record.device_id)
        .bind(&record.alarm_type)
        .bind(record.severity.as_str())
        .bind(record.status.as_str())
        .bind(&record.details)
        .bind(&record.triggered_by_rule_id)
        .bind(record.acknowledged_at_ms)
        .bind(record.cleared_at_ms)
        .bind(record.updated_at_ms)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_alarm(&self, alarm_id: &str) -> Result<Option<AlarmRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "select {ALARM_COLUMNS} from alarms where alarm_id = $1"
        ))
        .bind(alarm_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(alarm_from_row).transpose()
    }

    async fn list_alarms(&self, query: &AlarmQuery) -> Result<Vec<AlarmRecord>, StorageError> {
        let limit = query.limit.filter(|value| *value > 0);
        let sql = format!(
            "select {ALARM_COLUMNS} from alarms \
             where ($1::text is null or status = $1) \
             and ($2::text is null or severity = $2) \
             and ($3::text is null or device_id = $3) \
             {} \
             limit $4",
            order_clause(query)
        );
        let rows = sqlx::query(&sql)
            .bind(query.status.map(|value| value.as_str()))
            .bind(query.severity.map(|value| value.as_str()))
            .bind(query.device_id.as_deref())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(alarm_from_row).collect()
    }

    async fn list_open_alarms_for_rule(
        &self,
        rule_id: &str,
    ) -> Result<Vec<AlarmRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "select {ALARM_COLUMNS} from alarms \
             where triggered_by_rule_id = $1 and status <> 'cleared' \
             order by ts_ms asc"
        ))
        .bind(rule_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(alarm_from_row).collect()
    }

    async fn transition_status(
        &self,
        alarm_id: &str,
        from: AlarmStatus,
        to: AlarmStatus,
        ts_ms: i64,
    ) -> Result<Option<AlarmRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "update alarms set \
             status = $3, \
             acknowledged_at_ms = case when $3 = 'acknowledged' then $4 else acknowledged_at_ms end, \
             cleared_at_ms = case when $3 = 'cleared' then $4 else cleared_at_ms end, \
             updated_at_ms = $4 \
             where alarm_id = $1 and status = $2 \
             returning {ALARM_COLUMNS}"
        ))
        .bind(alarm_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(ts_ms)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(alarm_from_row).transpose()
    }
}
