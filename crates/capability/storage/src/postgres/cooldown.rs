//! Postgres 规则冷却状态存储实现
//!
//! 每条规则最多一行；清除冷却即删除该行。compare-and-set 按期望值拆成
//! insert / update / delete 三种条件语句，以 `rows_affected` 判断是否生效。

use crate::error::StorageError;
use crate::traits::CooldownStore;
use sqlx::{PgPool, Row};

pub struct PgCooldownStore {
    pool: PgPool,
}

impl PgCooldownStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CooldownStore for PgCooldownStore {
    async fn last_fired_at_ms(&self, rule_id: &str) -> Result<Option<i64>, StorageError> {
        let row = sqlx::query("select last_fired_at_ms from rule_cooldowns where rule_id = $1")
            .bind(rule_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(row.try_get("last_fired_at_ms")?))
    }

    async fn compare_and_set(
        &self,
        rule_id: &str,
        expected: Option<i64>,
        next: Option<i64>,
    ) -> Result<bool, StorageError> {
        let result = match (expected, next) {
            (None, None) => return Ok(self.last_fired_at_ms(rule_id).await?.is_none()),
            (None, Some(next)) => {
                sqlx::query(
                    "insert into rule_cooldowns (rule_id, last_fired_at_ms) values ($1, $2) \
                     on conflict (rule_id) do nothing",
                )
                .bind(rule_id)
                .bind(next)
                .execute(&self.pool)
                .await?
            }
            (Some(expected), Some(next)) => {
                sqlx::query(
                    "update rule_cooldowns set last_fired_at_ms = $3 \
                     where rule_id = $1 and last_fired_at_ms = $2",
                )
                .bind(rule_id)
                .bind(expected)
                .bind(next)
                .execute(&self.pool)
                .await?
            }
            (Some(expected), None) => {
                sqlx::query(
                    "delete from rule_cooldowns where rule_id = $1 and last_fired_at_ms = $2",
                )
                .bind(rule_id)
                .bind(expected)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected() == 1)
    }
}
