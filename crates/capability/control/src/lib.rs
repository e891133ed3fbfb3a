//! 控制能力：安全联锁引擎与设备控制。
//!
//! - [`interlock`]：按 (设备类型, 用途, 动作) 注册联锁规则，根据最新读数给出判定
//! - [`service`]：设备控制命令（校验 → 联锁 → 带版本的状态写入 → 审计）

pub mod error;
pub mod interlock;
pub mod service;

pub use error::ControlError;
pub use interlock::{
    DrainPhRule, InterlockBlock, InterlockEngine, InterlockKey, InterlockRule, InterlockVerdict,
    NO_SENSOR_DATA_WARNING, TankLevelRule,
};
pub use service::{ControlOutcome, DeviceControlService, DevicePreview};
