//! 追踪、请求 ID 生成与进程内计数器。
//!
//! 计数器为全局单例，通过 `/metrics` 以快照形式输出。

use serde::Serialize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricsSnapshot {
    pub readings_evaluated: u64,
    pub rules_evaluated: u64,
    pub alarms_raised: u64,
    pub alarms_suppressed: u64,
    pub alarms_auto_cleared: u64,
    pub rule_config_errors: u64,
    pub alarm_transitions: u64,
    pub alarm_transitions_rejected: u64,
    pub interlock_checks: u64,
    pub interlock_blocks: u64,
    pub device_commands_applied: u64,
    pub device_commands_rejected: u64,
    pub concurrency_conflicts: u64,
    pub evaluation_latency_ms_total: u64,
    pub evaluation_latency_ms_count: u64,
}

/// 进程内计数器。
pub struct TelemetryMetrics {
    readings_evaluated: AtomicU64,
    rules_evaluated: AtomicU64,
    alarms_raised: AtomicU64,
    alarms_suppressed: AtomicU64,
    alarms_auto_cleared: AtomicU64,
    rule_config_errors: AtomicU64,
    alarm_transitions: AtomicU64,
    alarm_transitions_rejected: AtomicU64,
    interlock_checks: AtomicU64,
    interlock_blocks: AtomicU64,
    device_commands_applied: AtomicU64,
    device_commands_rejected: AtomicU64,
    concurrency_conflicts: AtomicU64,
    evaluation_latency_ms_total: AtomicU64,
    evaluation_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            readings_evaluated: AtomicU64::new(0),
            rules_evaluated: AtomicU64::new(0),
            alarms_raised: AtomicU64::new(0),
            alarms_suppressed: AtomicU64::new(0),
            alarms_auto_cleared: AtomicU64::new(0),
            rule_config_errors: AtomicU64::new(0),
            alarm_transitions: AtomicU64::new(0),
            alarm_transitions_rejected: AtomicU64::new(0),
            interlock_checks: AtomicU64::new(0),
            interlock_blocks: AtomicU64::new(0),
            device_commands_applied: AtomicU64::new(0),
            device_commands_rejected: AtomicU64::new(0),
            concurrency_conflicts: AtomicU64::new(0),
            evaluation_latency_ms_total: AtomicU64::new(0),
            evaluation_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            readings_evaluated: self.readings_evaluated.load(Ordering::Relaxed),
            rules_evaluated: self.rules_evaluated.load(Ordering::Relaxed),
            alarms_raised: self.alarms_raised.load(Ordering::Relaxed),
            alarms_suppressed: self.alarms_suppressed.load(Ordering::Relaxed),
            alarms_auto_cleared: self.alarms_auto_cleared.load(Ordering::Relaxed),
            rule_config_errors: self.rule_config_errors.load(Ordering::Relaxed),
            alarm_transitions: self.alarm_transitions.load(Ordering::Relaxed),
            alarm_transitions_rejected: self.alarm_transitions_rejected.load(Ordering::Relaxed),
            interlock_checks: self.interlock_checks.load(Ordering::Relaxed),
            interlock_blocks: self.interlock_blocks.load(Ordering::Relaxed),
            device_commands_applied: self.device_commands_applied.load(Ordering::Relaxed),
            device_commands_rejected: self.device_commands_rejected.load(Ordering::Relaxed),
            concurrency_conflicts: self.concurrency_conflicts.load(Ordering::Relaxed),
            evaluation_latency_ms_total: self
                .evaluation_latency_ms_total
                .load(Ordering::Relaxed),
            evaluation_latency_ms_count: self
                .evaluation_latency_ms_count
                .load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    request_ids_from(None)
}

/// 沿用上游传入的 request_id（网关 / 反向代理生成的），trace_id 总是新生成。
///
/// 只接受 1..=128 个可见 ASCII 字符，其余情况重新生成。
pub fn request_ids_from(incoming: Option<&str>) -> RequestIds {
    let request_id = incoming
        .map(str::trim)
        .filter(|value| {
            !value.is_empty() && value.len() <= 128 && value.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    RequestIds {
        request_id,
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录已评估的读数。
pub fn record_reading_evaluated() {
    metrics().readings_evaluated.fetch_add(1, Ordering::Relaxed);
}

/// 记录已评估的规则次数。
pub fn record_rule_evaluated() {
    metrics().rules_evaluated.fetch_add(1, Ordering::Relaxed);
}

/// 记录新告警。
pub fn record_alarm_raised() {
    metrics().alarms_raised.fetch_add(1, Ordering::Relaxed);
}

/// 记录冷却期内被抑制的触发。
pub fn record_alarm_suppressed() {
    metrics().alarms_suppressed.fetch_add(1, Ordering::Relaxed);
}

/// 记录自动清除的告警。
pub fn record_alarm_auto_cleared() {
    metrics().alarms_auto_cleared.fetch_add(1, Ordering::Relaxed);
}

/// 记录规则配置错误（非法指标等）。
pub fn record_rule_config_error() {
    metrics().rule_config_errors.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功的告警状态流转。
pub fn record_alarm_transition() {
    metrics().alarm_transitions.fetch_add(1, Ordering::Relaxed);
}

/// 记录被拒绝的告警状态流转。
pub fn record_alarm_transition_rejected() {
    metrics()
        .alarm_transitions_rejected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录联锁检查次数。
pub fn record_interlock_check() {
    metrics().interlock_checks.fetch_add(1, Ordering::Relaxed);
}

/// 记录联锁拦截次数。
pub fn record_interlock_block() {
    metrics().interlock_blocks.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功执行的设备命令。
pub fn record_device_command_applied() {
    metrics()
        .device_commands_applied
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录被拒绝的设备命令（禁用、动作不支持、联锁）。
pub fn record_device_command_rejected() {
    metrics()
        .device_commands_rejected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录条件写入冲突次数。
pub fn record_concurrency_conflict() {
    metrics()
        .concurrency_conflicts
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录单条读数的评估耗时（毫秒）。
pub fn record_evaluation_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .evaluation_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .evaluation_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
