//! 规则冷却抑制。
//!
//! 每条规则记录最近一次触发时间（读数时间戳）。冷却窗口 `[T, T + C)` 内的再次
//! 触发被抑制，`T + C` 起可再次触发。时间戳不晚于上次触发的读数（重放、乱序）
//! 同样被抑制，因此同一条读数重复评估不会产生第二条告警。
//!
//! 状态保存在 [`CooldownStore`] 中；写入使用 compare-and-set，多个进程共享
//! 同一存储时也不会重复触发。

use crate::error::AlarmError;
use greenhouse_storage::{AlarmRuleRecord, CooldownStore};
use greenhouse_telemetry::record_concurrency_conflict;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// 冷却判定（纯函数）。
pub fn is_suppressed(last_fired_at_ms: Option<i64>, now_ms: i64, cooldown_ms: i64) -> bool {
    match last_fired_at_ms {
        None => false,
        Some(last) => now_ms <= last || now_ms.saturating_sub(last) < cooldown_ms,
    }
}

/// 一次触发尝试的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    /// 已记录本次触发；`previous` 用于告警写入失败时回滚。
    Fired { previous: Option<i64> },
    Suppressed { last_fired_at_ms: i64 },
}

/// 规则冷却跟踪器。
pub struct CooldownTracker {
    store: Arc<dyn CooldownStore>,
    /// 进程内按规则串行化 "判定 → 记录 → 创建告警"
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    max_retries: u32,
}

impl CooldownTracker {
    pub fn new(store: Arc<dyn CooldownStore>) -> Self {
        Self::with_max_retries(store, 1)
    }

    pub fn with_max_retries(store: Arc<dyn CooldownStore>, max_retries: u32) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            max_retries,
        }
    }

    /// 获取规则级互斥锁。持有期间同一规则的其他评估会等待。
    pub async fn lock_rule(&self, rule_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(rule_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    pub async fn last_fired_at_ms(&self, rule_id: &str) -> Result<Option<i64>, AlarmError> {
        Ok(self.store.last_fired_at_ms(rule_id).await?)
    }

    /// 当前时刻该规则是否处于冷却中。
    pub async fn should_suppress(
        &self,
        rule: &AlarmRuleRecord,
        now_ms: i64,
    ) -> Result<bool, AlarmError> {
        let last = self.store.last_fired_at_ms(&rule.rule_id).await?;
        Ok(is_suppressed(last, now_ms, rule.cooldown_ms()))
    }

    /// 无条件记录一次触发。
    pub async fn record_fire(&self, rule_id: &str, now_ms: i64) -> Result<(), AlarmError> {
        self.replace(rule_id, Some(now_ms)).await
    }

    /// 判定冷却并原子记录触发。
    ///
    /// 存储中的值在读取后被其他进程修改时重新判定，超过重试次数返回 `Conflict`。
    pub async fn try_fire(
        &self,
        rule: &AlarmRuleRecord,
        now_ms: i64,
    ) -> Result<FireDecision, AlarmError> {
        let mut attempt = 0u32;
        loop {
            let last = self.store.last_fired_at_ms(&rule.rule_id).await?;
            if let Some(last_fired_at_ms) = last {
                if is_suppressed(last, now_ms, rule.cooldown_ms()) {
                    return Ok(FireDecision::Suppressed { last_fired_at_ms });
                }
            }
            if self
                .store
                .compare_and_set(&rule.rule_id, last, Some(now_ms))
                .await?
            {
                return Ok(FireDecision::Fired { previous: last });
            }
            record_concurrency_conflict();
            attempt += 1;
            debug!(
                target: "greenhouse.alarm",
                rule_id = %rule.rule_id,
                attempt = attempt,
                "cooldown_cas_conflict"
            );
            if attempt > self.max_retries {
                return Err(AlarmError::Conflict(format!(
                    "cooldown state of rule {} changed concurrently",
                    rule.rule_id
                )));
            }
        }
    }

    /// 撤销 `try_fire` 记录的触发（告警写入失败时调用）。
    ///
    /// 只有存储中的值仍是本次写入的时间戳时才回滚。
    pub async fn rollback(
        &self,
        rule_id: &str,
        fired_at_ms: i64,
        previous: Option<i64>,
    ) -> Result<bool, AlarmError> {
        Ok(self
            .store
            .compare_and_set(rule_id, Some(fired_at_ms), previous)
            .await?)
    }

    /// 清除规则的冷却状态（规则删除时调用）。
    pub async fn reset(&self, rule_id: &str) -> Result<(), AlarmError> {
        self.replace(rule_id, None).await?;
        if let Ok(mut locks) = self.locks.lock() {
            locks.remove(rule_id);
        }
        Ok(())
    }

    async fn replace(&self, rule_id: &str, next: Option<i64>) -> Result<(), AlarmError> {
        let mut attempt = 0u32;
        loop {
            let current = self.store.last_fired_at_ms(rule_id).await?;
            if current == next || self.store.compare_and_set(rule_id, current, next).await? {
                return Ok(());
            }
            record_concurrency_conflict();
            attempt += 1;
            if attempt > self.max_retries {
                return Err(AlarmError::Conflict(format!(
                    "cooldown state of rule {} changed concurrently",
                    rule_id
                )));
            }
        }
    }
}
