//! Postgres 连接池与表结构初始化。

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("../../../../migrations/0001_init.sql");

/// 获取连接的等待上限；超时按存储错误返回，避免请求无限挂起。
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// 执行内置建表脚本。脚本全部使用 `if not exists`，可重复执行。
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
