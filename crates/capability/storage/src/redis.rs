//! Redis 规则冷却状态存储
//!
//! 多个服务实例共享同一 Redis 时，冷却判定在各实例间保持一致。
//! compare-and-set 由一段 Lua 脚本在服务端原子执行。

use crate::error::StorageError;
use crate::traits::CooldownStore;
use redis::AsyncCommands;

/// KEYS[1] = 冷却键；ARGV[1] = 期望值（空串表示不存在）；ARGV[2] = 新值（空串表示删除）
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current == false then
  current = ''
end
if current ~= ARGV[1] then
  return 0
end
if ARGV[2] == '' then
  redis.call('DEL', KEYS[1])
else
  redis.call('SET', KEYS[1], ARGV[2])
end
return 1
"#;

fn cooldown_key(rule_id: &str) -> String {
    format!("greenhouse:rule:{}:last_fired_at_ms", rule_id)
}

fn encode(value: Option<i64>) -> String {
    value.map(|ts_ms| ts_ms.to_string()).unwrap_or_default()
}

/// Redis 冷却状态存储
pub struct RedisCooldownStore {
    client: redis::Client,
    script: redis::Script,
}

impl RedisCooldownStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            script: redis::Script::new(COMPARE_AND_SET_SCRIPT),
        }
    }

    pub fn connect(redis_url: &str) -> Result<Self, StorageError> {
        Ok(Self::new(redis::Client::open(redis_url)?))
    }
}

#[async_trait::async_trait]
impl CooldownStore for RedisCooldownStore {
    async fn last_fired_at_ms(&self, rule_id: &str) -> Result<Option<i64>, StorageError> {
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        let data: Option<String> = connection.get(cooldown_key(rule_id)).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let ts_ms = data
            .parse::<i64>()
            .map_err(|err| StorageError::corrupt("cooldown value", err))?;
        Ok(Some(ts_ms))
    }

    async fn compare_and_set(
        &self,
        rule_id: &str,
        expected: Option<i64>,
        next: Option<i64>,
    ) -> Result<bool, StorageError> {
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        let applied: i64 = self
            .script
            .key(cooldown_key(rule_id))
            .arg(encode(expected))
            .arg(encode(next))
            .invoke_async(&mut connection)
            .await?;
        Ok(applied == 1)
    }
}
