//! 告警条件、严重级别与告警状态机。

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 规则比较条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmCondition {
    GreaterThan,
    LessThan,
    /// 精确相等，不带容差。
    Equals,
}

impl AlarmCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmCondition::GreaterThan => "greater_than",
            AlarmCondition::LessThan => "less_than",
            AlarmCondition::Equals => "equals",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AlarmCondition::GreaterThan => ">",
            AlarmCondition::LessThan => "<",
            AlarmCondition::Equals => "==",
        }
    }
}

impl fmt::Display for AlarmCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmCondition {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "greater_than" | ">" => Ok(AlarmCondition::GreaterThan),
            "less_than" | "<" => Ok(AlarmCondition::LessThan),
            "equals" | "==" => Ok(AlarmCondition::Equals),
            _ => Err(DomainError::UnknownCondition(value.to_string())),
        }
    }
}

/// 告警严重级别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlarmSeverity {
    Info,
    #[default]
    Warning,
    Critical,
}

impl AlarmSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmSeverity::Info => "info",
            AlarmSeverity::Warning => "warning",
            AlarmSeverity::Critical => "critical",
        }
    }

    /// 排序权重（越大越严重）。
    pub fn rank(&self) -> u8 {
        match self {
            AlarmSeverity::Info => 0,
            AlarmSeverity::Warning => 1,
            AlarmSeverity::Critical => 2,
        }
    }
}

impl fmt::Display for AlarmSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmSeverity {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(AlarmSeverity::Info),
            "warning" => Ok(AlarmSeverity::Warning),
            "critical" => Ok(AlarmSeverity::Critical),
            _ => Err(DomainError::UnknownSeverity(value.to_string())),
        }
    }
}

/// 告警状态。
///
/// ```text
/// (创建) ──> ACTIVE ──> ACKNOWLEDGED ──> CLEARED
///              └─────────────────────────^
/// ```
///
/// 只有规则评估流水线会创建 ACTIVE 告警；状态更新不能回到 ACTIVE。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Cleared,
}

impl AlarmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmStatus::Active => "active",
            AlarmStatus::Acknowledged => "acknowledged",
            AlarmStatus::Cleared => "cleared",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            AlarmStatus::Active => 0,
            AlarmStatus::Acknowledged => 1,
            AlarmStatus::Cleared => 2,
        }
    }

    /// 尚未清除。
    pub fn is_open(&self) -> bool {
        matches!(self, AlarmStatus::Active | AlarmStatus::Acknowledged)
    }

    /// 校验状态流转，返回目标状态。相同状态视为无操作并返回成功。
    pub fn transition_to(self, next: AlarmStatus) -> Result<AlarmStatus, DomainError> {
        match (self, next) {
            (from, to) if from == to => Ok(to),
            (AlarmStatus::Active, AlarmStatus::Acknowledged)
            | (AlarmStatus::Active, AlarmStatus::Cleared)
            | (AlarmStatus::Acknowledged, AlarmStatus::Cleared) => Ok(next),
            (from, to) => Err(DomainError::InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AlarmStatus::Active),
            "acknowledged" => Ok(AlarmStatus::Acknowledged),
            "cleared" => Ok(AlarmStatus::Cleared),
            _ => Err(DomainError::UnknownStatus(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_succeed() {
        let acknowledged = AlarmStatus::Active
            .transition_to(AlarmStatus::Acknowledged)
            .expect("ack");
        let cleared = acknowledged
            .transition_to(AlarmStatus::Cleared)
            .expect("clear");
        assert_eq!(cleared, AlarmStatus::Cleared);
        assert_eq!(
            AlarmStatus::Active.transition_to(AlarmStatus::Cleared),
            Ok(AlarmStatus::Cleared)
        );
    }

    #[test]
    fn reactivation_is_rejected() {
        assert_eq!(
            AlarmStatus::Acknowledged.transition_to(AlarmStatus::Active),
            Err(DomainError::InvalidTransition {
                from: AlarmStatus::Acknowledged,
                to: AlarmStatus::Active,
            })
        );
        assert!(AlarmStatus::Cleared.transition_to(AlarmStatus::Active).is_err());
        assert!(
            AlarmStatus::Cleared
                .transition_to(AlarmStatus::Acknowledged)
                .is_err()
        );
    }

    #[test]
    fn same_state_is_noop() {
        for status in [
            AlarmStatus::Active,
            AlarmStatus::Acknowledged,
            AlarmStatus::Cleared,
        ] {
            assert_eq!(status.transition_to(status), Ok(status));
        }
    }

    #[test]
    fn invalid_transition_message() {
        let err = AlarmStatus::Cleared
            .transition_to(AlarmStatus::Active)
            .expect_err("invalid");
        assert_eq!(
            err.to_string(),
            "invalid status transition from cleared to active"
        );
    }

    #[test]
    fn condition_parse_accepts_symbols() {
        assert_eq!(">".parse::<AlarmCondition>(), Ok(AlarmCondition::GreaterThan));
        assert_eq!(
            "LESS_THAN".parse::<AlarmCondition>(),
            Ok(AlarmCondition::LessThan)
        );
        assert!("between".parse::<AlarmCondition>().is_err());
    }

    #[test]
    fn severity_defaults_to_warning() {
        assert_eq!(AlarmSeverity::default(), AlarmSeverity::Warning);
        assert!(AlarmSeverity::Critical.rank() > AlarmSeverity::Info.rank());
    }
}
