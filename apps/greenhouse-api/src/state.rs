//! 应用状态与存储装配。

use domain::Clock;
use greenhouse_alarm::{AlarmLifecycle, CooldownTracker, PipelineConfig, RuleEvaluator, RuleService};
use greenhouse_config::{AppConfig, ConfigError, StorageBackend};
use greenhouse_control::{DeviceControlService, InterlockEngine};
use greenhouse_storage::{
    AlarmRuleStore, AlarmStore, AuditLogStore, CooldownStore, DeviceStore, InMemoryAlarmRuleStore,
    InMemoryAlarmStore, InMemoryAuditLogStore, InMemoryCooldownStore, InMemoryDeviceStore,
    InMemoryReadingStore, PgAlarmRuleStore, PgAlarmStore, PgAuditLogStore, PgCooldownStore,
    PgDeviceStore, PgReadingStore, ReadingStore, RedisCooldownStore, connect_pool, ensure_schema,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// 各资源的存储实例。
#[derive(Clone)]
pub struct Stores {
    pub devices: Arc<dyn DeviceStore>,
    pub readings: Arc<dyn ReadingStore>,
    pub rules: Arc<dyn AlarmRuleStore>,
    pub alarms: Arc<dyn AlarmStore>,
    pub cooldowns: Arc<dyn CooldownStore>,
    pub audit: Arc<dyn AuditLogStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            devices: Arc::new(InMemoryDeviceStore::new()),
            readings: Arc::new(InMemoryReadingStore::new()),
            rules: Arc::new(InMemoryAlarmRuleStore::new()),
            alarms: Arc::new(InMemoryAlarmStore::new()),
            cooldowns: Arc::new(InMemoryCooldownStore::new()),
            audit: Arc::new(InMemoryAuditLogStore::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            devices: Arc::new(PgDeviceStore::new(pool.clone())),
            readings: Arc::new(PgReadingStore::new(pool.clone())),
            rules: Arc::new(PgAlarmRuleStore::new(pool.clone())),
            alarms: Arc::new(PgAlarmStore::new(pool.clone())),
            cooldowns: Arc::new(PgCooldownStore::new(pool.clone())),
            audit: Arc::new(PgAuditLogStore::new(pool)),
        }
    }

    /// 按配置选择存储；配置了 Redis 时冷却状态改存 Redis。
    pub async fn from_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let mut stores = match config.storage {
            StorageBackend::Memory => Self::in_memory(),
            StorageBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| ConfigError::Missing("GREENHOUSE_DATABASE_URL".to_string()))?;
                let pool = connect_pool(database_url, config.database_max_connections).await?;
                ensure_schema(&pool).await?;
                info!(target: "greenhouse.api", "postgres_schema_ready");
                Self::postgres(pool)
            }
        };
        if let Some(redis_url) = config.redis_url.as_deref() {
            stores.cooldowns = Arc::new(RedisCooldownStore::connect(redis_url)?);
            info!(target: "greenhouse.api", "redis_cooldown_store_enabled");
        }
        Ok(stores)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub clock: Arc<dyn Clock>,
    pub evaluator: RuleEvaluator,
    pub lifecycle: AlarmLifecycle,
    pub rules: RuleService,
    pub control: Arc<DeviceControlService>,
}

impl AppState {
    pub fn new(stores: Stores, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let retries = config.conflict_max_retries;
        let cooldown = Arc::new(CooldownTracker::with_max_retries(
            stores.cooldowns.clone(),
            retries,
        ));
        let lifecycle = AlarmLifecycle::new(stores.alarms.clone(), stores.audit.clone(), clock.clone())
            .with_max_retries(retries);
        let evaluator = RuleEvaluator::new(
            stores.rules.clone(),
            stores.devices.clone(),
            stores.alarms.clone(),
            cooldown.clone(),
            lifecycle.clone(),
            PipelineConfig {
                auto_clear: config.alarm_auto_clear,
            },
        );
        let rules = RuleService::new(
            stores.rules.clone(),
            stores.devices.clone(),
            cooldown,
            config.default_cooldown_seconds,
        );
        let control = DeviceControlService::new(
            stores.devices.clone(),
            stores.readings.clone(),
            stores.audit.clone(),
            Arc::new(InterlockEngine::with_defaults(&config.interlock)),
            clock.clone(),
        )
        .with_max_retries(retries);
        Self {
            stores,
            clock,
            evaluator,
            lifecycle,
            rules,
            control: Arc::new(control),
        }
    }
}
