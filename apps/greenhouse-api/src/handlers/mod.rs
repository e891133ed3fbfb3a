//! Handlers 模块

pub mod alarm_rules;
pub mod alarms;
pub mod audit;
pub mod devices;
pub mod metrics;
pub mod readings;

pub use alarm_rules::*;
pub use alarms::*;
pub use audit::*;
pub use devices::*;
pub use metrics::*;
pub use readings::*;
