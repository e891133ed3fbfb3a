//! # PostgreSQL 存储实现模块
//!
//! 所有存储接口的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 查询使用参数绑定
//! 2. **条件更新**：并发敏感的写入放在单条 `update ... where` 中完成，
//!    以 `rows_affected` / `returning` 判断是否生效
//! 3. **枚举落库为文本**：读取时解析，非法值报告为 `StorageError`
//!
//! ## 包含的实现
//!
//! - **DeviceStore** (`device.rs`)：`version` 列做乐观并发
//! - **ReadingStore** (`reading.rs`)：指标存为 jsonb
//! - **AlarmRuleStore** (`alarm_rule.rs`)
//! - **AlarmStore** (`alarm.rs`)：按白名单拼接排序子句
//! - **CooldownStore** (`cooldown.rs`)：`rule_cooldowns` 表
//! - **AuditLogStore** (`audit.rs`)
//!
//! 表结构见仓库根目录 `migrations/0001_init.sql`，可通过
//! [`crate::ensure_schema`] 初始化。

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
