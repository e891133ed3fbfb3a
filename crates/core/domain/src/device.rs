//! 设备分类与控制动作。
//!
//! 设备类型与用途都是封闭枚举。旧系统把类型写在自由文本里（如
//! `"PUMP water main"`），`DeviceClass::from_label` 只在边界处解析一次，
//! 同时出现两种类型关键字的标签直接拒绝。

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 设备类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    Pump,
    Valve,
    Light,
    Fan,
    Heater,
    Generic,
}

impl DeviceType {
    pub const ALL: [DeviceType; 6] = [
        DeviceType::Pump,
        DeviceType::Valve,
        DeviceType::Light,
        DeviceType::Fan,
        DeviceType::Heater,
        DeviceType::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Pump => "PUMP",
            DeviceType::Valve => "VALVE",
            DeviceType::Light => "LIGHT",
            DeviceType::Fan => "FAN",
            DeviceType::Heater => "HEATER",
            DeviceType::Generic => "GENERIC",
        }
    }

    /// 该类型允许的控制动作。
    pub fn allowed_actions(&self) -> &'static [DeviceAction] {
        match self {
            DeviceType::Valve => &[DeviceAction::Open, DeviceAction::Close],
            DeviceType::Pump
            | DeviceType::Light
            | DeviceType::Fan
            | DeviceType::Heater
            | DeviceType::Generic => &[DeviceAction::On, DeviceAction::Off],
        }
    }

    pub fn supports(&self, action: DeviceAction) -> bool {
        self.allowed_actions().contains(&action)
    }

    /// 设备列表预览联锁时使用的"开启"动作。
    pub fn default_action(&self) -> DeviceAction {
        match self {
            DeviceType::Valve => DeviceAction::Open,
            _ => DeviceAction::On,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let upper = value.trim().to_ascii_uppercase();
        DeviceType::ALL
            .iter()
            .copied()
            .find(|device_type| device_type.as_str() == upper)
            .ok_or_else(|| DomainError::UnknownDeviceType(value.to_string()))
    }
}

/// 设备用途（同一类型下区分需要不同联锁的设备）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DevicePurpose {
    #[default]
    General,
    /// 清水供给（如主水泵）
    Water,
    /// 排放（如排水阀）
    Drain,
}

impl DevicePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePurpose::General => "GENERAL",
            DevicePurpose::Water => "WATER",
            DevicePurpose::Drain => "DRAIN",
        }
    }
}

impl fmt::Display for DevicePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevicePurpose {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GENERAL" => Ok(DevicePurpose::General),
            "WATER" => Ok(DevicePurpose::Water),
            "DRAIN" => Ok(DevicePurpose::Drain),
            _ => Err(DomainError::UnknownDevicePurpose(value.to_string())),
        }
    }
}

/// 设备控制动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceAction {
    On,
    Off,
    Open,
    Close,
}

impl DeviceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceAction::On => "ON",
            DeviceAction::Off => "OFF",
            DeviceAction::Open => "OPEN",
            DeviceAction::Close => "CLOSE",
        }
    }

    /// 动作成功后写入设备的状态值。
    pub fn resulting_status(&self) -> &'static str {
        match self {
            DeviceAction::On => "ON",
            DeviceAction::Off => "OFF",
            DeviceAction::Open => "OPEN",
            DeviceAction::Close => "CLOSED",
        }
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ON" => Ok(DeviceAction::On),
            "OFF" => Ok(DeviceAction::Off),
            "OPEN" => Ok(DeviceAction::Open),
            "CLOSE" => Ok(DeviceAction::Close),
            _ => Err(DomainError::UnknownAction(value.to_string())),
        }
    }
}

/// 设备分类（类型 + 用途），联锁处理器按它分派。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceClass {
    pub device_type: DeviceType,
    pub purpose: DevicePurpose,
}

impl DeviceClass {
    pub fn new(device_type: DeviceType, purpose: DevicePurpose) -> Self {
        Self {
            device_type,
            purpose,
        }
    }

    /// 解析旧式自由文本标签，例如 `"PUMP water main"`、`"VALVE drain"`。
    ///
    /// 按非字母数字字符切词后整词匹配；没有类型关键字时归为 GENERIC，
    /// 出现多个不同类型关键字时返回 `AmbiguousDeviceLabel`。
    /// `DRAIN` 优先于 `WATER`。
    pub fn from_label(label: &str) -> Result<Self, DomainError> {
        let tokens: Vec<String> = label
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(|token| token.to_ascii_uppercase())
            .collect();

        let mut found: Option<DeviceType> = None;
        for token in &tokens {
            let Some(device_type) = DeviceType::ALL
                .iter()
                .copied()
                .find(|device_type| device_type.as_str() == token)
            else {
                continue;
            };
            match found {
                Some(existing) if existing != device_type => {
                    return Err(DomainError::AmbiguousDeviceLabel(label.to_string()));
                }
                _ => found = Some(device_type),
            }
        }

        let has = |keyword: &str| tokens.iter().any(|token| token == keyword);
        let purpose = if has("DRAIN") {
            DevicePurpose::Drain
        } else if has("WATER") {
            DevicePurpose::Water
        } else {
            DevicePurpose::General
        };

        Ok(Self {
            device_type: found.unwrap_or(DeviceType::Generic),
            purpose,
        })
    }
}
