//! 内存存储实现模块
//!
//! 用于测试和单机演示（`GREENHOUSE_STORAGE=memory`）。
//!
//! 包含以下实现：
//! - DeviceStore: InMemoryDeviceStore
//! - ReadingStore: InMemoryReadingStore
//! - AlarmRuleStore: InMemoryAlarmRuleStore
//! - AlarmStore: InMemoryAlarmStore
//! - CooldownStore: InMemoryCooldownStore
//! - AuditLogStore: InMemoryAuditLogStore

pub mod alarm;
pub mod alarm_rule;
pub mod audit;
pub mod cooldown;
pub mod device;
pub mod reading;

pub use alarm::*;
pub use alarm_rule::*;
pub use audit::*;
pub use cooldown::*;
pub use device::*;
pub use reading::*;
