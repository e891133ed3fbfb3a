//! Postgres 告警规则存储实现

use crate::error::StorageError;
use crate::models::{AlarmRuleRecord, AlarmRuleUpdate};
use crate::traits::AlarmRuleStore;
use crate::validation::{ensure_finite, ensure_non_empty};
use domain::{AlarmCondition, AlarmSeverity};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const RULE_COLUMNS: &str = "rule_id, name, device_id, sensor_metric, condition, threshold_value, \
     severity, is_active, cooldown_period_seconds";

pub struct PgAlarmRuleStore {
    pool: PgPool,
}

impl PgAlarmRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn rule_from_row(row: &PgRow) -> Result<AlarmRuleRecord, StorageError> {
    let condition: String = row.try_get("condition")?;
    let severity: String = row.try_get("severity")?;
    let cooldown: i64 = row.try_get("cooldown_period_seconds")?;
    Ok(AlarmRuleRecord {
        rule_id: row.try_get("rule_id")?,
        name: row.try_get("name")?,
        device_id: row.try_get("device_id")?,
        sensor_metric: row.try_get("sensor_metric")?,
        condition: condition.parse::<AlarmCondition>()?,
        threshold_value: row.try_get("threshold_value")?,
        severity: severity.parse::<AlarmSeverity>()?,
        is_active: row.try_get("is_active")?,
        cooldown_period_seconds: u32::try_from(cooldown)
            .map_err(|err| StorageError::corrupt("cooldown period", err))?,
    })
}

#[async_trait::async_trait]
impl AlarmRuleStore for PgAlarmRuleStore {
    async fn list_rules(&self) -> Result<Vec<AlarmRuleRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "select {RULE_COLUMNS} from alarm_rules order by name, rule_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(rule_from_row).collect()
    }

    async fn list_active_rules_for_device(
        &self,
        device_id: &str,
    ) -> Result<Vec<AlarmRuleRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "select {RULE_COLUMNS} from alarm_rules \
             where device_id = $1 and is_active \
             order by name, rule_id"
        ))
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(rule_from_row).collect()
    }

    async fn find_rule(&self, rule_id: &str) -> Result<Option<AlarmRuleRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "select {RULE_COLUMNS} from alarm_rules where rule_id = $1"
        ))
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(rule_from_row).transpose()
    }

    async fn create_rule(&self, record: AlarmRuleRecord) -> Result<AlarmRuleRecord, StorageError> {
        ensure_non_empty("name", &record.name)?;
        ensure_finite("threshold_value", record.threshold_value)?;
        sqlx::query(
            "insert into alarm_rules \
             (rule_id, name, device_id, sensor_metric, condition, threshold_value, severity, \
              is_active, cooldown_period_seconds) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&record.rule_id)
        .bind(&record.name)
        .bind(&record.device_id)
        .bind(&record.sensor_metric)
        .bind(record.condition.as_str())
        .bind(record.threshold_value)
        .bind(record.severity.as_str())
        .bind(record.is_active)
        .bind(i64::from(record.cooldown_period_seconds))
        .execute(&self.pool)
        .await?;
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
        let row = sqlx::query(&format!(
            "update alarm_rules set \
             name = coalesce($2, name), \
             device_id = coalesce($3, device_id), \
             sensor_metric = coalesce($4, sensor_metric), \
             condition = coalesce($5, condition), \
             threshold_value = coalesce($6, threshold_value), \
             severity = coalesce($7, severity), \
             is_active = coalesce($8, is_active), \
             cooldown_period_seconds = coalesce($9, cooldown_period_seconds) \
             where rule_id = $1 \
             returning {RULE_COLUMNS}"
        ))
        .bind(rule_id)
        .bind(update.name)
        .bind(update.device_id)
        .bind(update.sensor_metric)
        .bind(update.condition.map(|value| value.as_str()))
        .bind(update.threshold_value)
        .bind(update.severity.map(|value| value.as_str()))
        .bind(update.is_active)
        .bind(update.cooldown_period_seconds.map(i64::from))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(rule_from_row).transpose()
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("delete from alarm_rules where rule_id = $1")
            .bind(rule_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_rules_for_device(&self, device_id: &str) -> Result<usize, StorageError> {
        let row = sqlx::query("select count(*) as total from alarm_rules where device_id = $1")
            .bind(device_id)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as usize)
    }
}
