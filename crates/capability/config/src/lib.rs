//! 应用运行配置加载。
//!
//! 所有配置来自 `GREENHOUSE_` 前缀的环境变量；除 Postgres 模式下的
//! `GREENHOUSE_DATABASE_URL` 外均有默认值。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 存储后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// 进程内存储（测试 / 单机演示）
    Memory,
    Postgres,
}

/// 联锁阈值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterlockConfig {
    /// 水泵开启所需的最低水箱水量
    pub min_tank_water_volume: f64,
    /// 排水阀开启允许的 pH 下限（含）
    pub drain_ph_min: f64,
    /// 排水阀开启允许的 pH 上限（含）
    pub drain_ph_max: f64,
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self {
            min_tank_water_volume: 10.0,
            drain_ph_min: 5.0,
            drain_ph_max: 9.0,
        }
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    /// Postgres 连接池上限
    pub database_max_connections: u32,
    /// 配置后规则冷却状态写入 Redis（多实例共享）
    pub redis_url: Option<String>,
    /// 条件不再满足时自动清除告警
    pub alarm_auto_clear: bool,
    pub default_cooldown_seconds: u32,
    /// 并发冲突后的重试次数
    pub conflict_max_retries: u32,
    pub interlock: InterlockConfig,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr =
            env::var("GREENHOUSE_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let storage = read_storage_backend("GREENHOUSE_STORAGE")?;
        let database_url = read_optional("GREENHOUSE_DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("GREENHOUSE_DATABASE_URL".to_string()));
        }
        let database_max_connections =
            read_u32_with_default("GREENHOUSE_DATABASE_MAX_CONNECTIONS", 8)?;
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid(
                "GREENHOUSE_DATABASE_MAX_CONNECTIONS".to_string(),
                "0".to_string(),
            ));
        }
        let redis_url = read_optional("GREENHOUSE_REDIS_URL");
        let alarm_auto_clear = read_bool_with_default("GREENHOUSE_ALARM_AUTO_CLEAR", false);
        let default_cooldown_seconds =
            read_u32_with_default("GREENHOUSE_DEFAULT_COOLDOWN_SECONDS", 300)?;
        let conflict_max_retries = read_u32_with_default("GREENHOUSE_CONFLICT_MAX_RETRIES", 1)?;

        let defaults = InterlockConfig::default();
        let interlock = InterlockConfig {
            min_tank_water_volume: read_f64_with_default(
                "GREENHOUSE_INTERLOCK_MIN_TANK_VOLUME",
                defaults.min_tank_water_volume,
            )?,
            drain_ph_min: read_f64_with_default(
                "GREENHOUSE_INTERLOCK_PH_MIN",
                defaults.drain_ph_min,
            )?,
            drain_ph_max: read_f64_with_default(
                "GREENHOUSE_INTERLOCK_PH_MAX",
                defaults.drain_ph_max,
            )?,
        };
        if interlock.drain_ph_min > interlock.drain_ph_max {
            return Err(ConfigError::Invalid(
                "GREENHOUSE_INTERLOCK_PH_MIN".to_string(),
                format!("{} > {}", interlock.drain_ph_min, interlock.drain_ph_max),
            ));
        }

        Ok(Self {
            http_addr,
            storage,
            database_url,
            database_max_connections,
            redis_url,
            alarm_auto_clear,
            default_cooldown_seconds,
            conflict_max_retries,
            interlock,
        })
    }
}

fn read_storage_backend(key: &str) -> Result<StorageBackend, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(StorageBackend::Memory),
    };
    match value.to_ascii_lowercase().as_str() {
        "" | "memory" => Ok(StorageBackend::Memory),
        "postgres" => Ok(StorageBackend::Postgres),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_f64_with_default(key: &str, default: f64) -> Result<f64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
