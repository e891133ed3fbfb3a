//! 温室监控领域模型。
//!
//! 只包含纯数据与纯逻辑，不做任何 I/O：
//! - `reading`：传感器读数与指标目录
//! - `device`：设备类型、用途、动作及旧式标签解析
//! - `alarm`：告警条件、严重级别、告警状态机
//! - `clock`：可注入时钟

pub mod alarm;
pub mod clock;
pub mod device;
pub mod error;
pub mod reading;

pub use alarm::{AlarmCondition, AlarmSeverity, AlarmStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use device::{DeviceAction, DeviceClass, DevicePurpose, DeviceType};
pub use error::DomainError;
pub use reading::{SensorMetric, SensorReading};
