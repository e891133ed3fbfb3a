//! 告警能力：阈值判定、冷却抑制、告警生命周期与规则评估流水线。
//!
//! 组件自底向上：
//! - [`threshold`]：纯函数阈值判定
//! - [`cooldown`]：按规则记录最近触发时间并抑制重复触发
//! - [`lifecycle`]：告警创建与 ACTIVE / ACKNOWLEDGED / CLEARED 状态流转
//! - [`pipeline`]：每条读数驱动一次规则评估
//! - [`rules`]：告警规则管理（校验 + 持久化）

pub mod cooldown;
pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod rules;
pub mod threshold;

pub use cooldown::{CooldownTracker, FireDecision, is_suppressed};
pub use error::AlarmError;
pub use lifecycle::{AlarmLifecycle, SENSOR_THRESHOLD_ALARM_TYPE, SYSTEM_ACTOR};
pub use pipeline::{EvaluationOutcome, PipelineConfig, RuleError, RuleErrorKind, RuleEvaluator};
pub use rules::{NewAlarmRule, RuleService};
pub use threshold::evaluate;
