//! 安全联锁引擎。
//!
//! 联锁规则按 `(设备类型, 用途, 动作)` 注册，没有注册规则的组合默认放行。
//! 同一组合的所有规则都会执行，任一规则阻止即阻止，原因以 `"; "` 连接。
//! 没有任何读数时放行，并在 `conditions.warning` 中提示。

use domain::{DeviceAction, DeviceClass, DevicePurpose, DeviceType, SensorMetric, SensorReading};
use greenhouse_config::InterlockConfig;
use greenhouse_storage::DeviceRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 没有读数时写入 `conditions.warning` 的提示。
pub const NO_SENSOR_DATA_WARNING: &str = "No sensor data available for safety checks";

/// 联锁判定结果。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterlockVerdict {
    pub blocked: bool,
    pub reason: Option<String>,
    pub conditions: BTreeMap<String, serde_json::Value>,
}

impl InterlockVerdict {
    pub fn allowed() -> Self {
        Self::default()
    }

    fn block(&mut self, block: InterlockBlock) {
        self.reason = Some(match self.reason.take() {
            Some(existing) => format!("{}; {}", existing, block.reason),
            None => block.reason,
        });
        self.blocked = true;
        self.conditions
            .insert(block.metric.as_str().to_string(), serde_json::json!(block.observed));
    }
}

/// 单条规则的阻止结论。
#[derive(Debug, Clone, PartialEq)]
pub struct InterlockBlock {
    pub reason: String,
    /// 触发阻止的指标及其读数，写入 `conditions`
    pub metric: SensorMetric,
    pub observed: f64,
}

/// 联锁规则。规则只读取指标值，缺失的指标不构成阻止。
pub trait InterlockRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, reading: &SensorReading) -> Option<InterlockBlock>;
}

/// 水箱水量过低时禁止开启清水泵。
#[derive(Debug, Clone, Copy)]
pub struct TankLevelRule {
    pub min_volume: f64,
}

impl InterlockRule for TankLevelRule {
    fn name(&self) -> &'static str {
        "tank_level"
    }

    fn check(&self, reading: &SensorReading) -> Option<InterlockBlock> {
        let volume = reading.value(SensorMetric::TankWaterVolume)?;
        (volume < self.min_volume).then(|| InterlockBlock {
            reason: "Insufficient water level in tank".to_string(),
            metric: SensorMetric::TankWaterVolume,
            observed: volume,
        })
    }
}

/// 水体 pH 超出 `[min, max]` 时禁止打开排水阀。
#[derive(Debug, Clone, Copy)]
pub struct DrainPhRule {
    pub min_ph: f64,
    pub max_ph: f64,
}

impl InterlockRule for DrainPhRule {
    fn name(&self) -> &'static str {
        "drain_ph"
    }

    fn check(&self, reading: &SensorReading) -> Option<InterlockBlock> {
        let ph = reading.value(SensorMetric::WaterPh)?;
        (ph < self.min_ph || ph > self.max_ph).then(|| InterlockBlock {
            reason: format!("Water pH level unsafe: {}", ph),
            metric: SensorMetric::WaterPh,
            observed: ph,
        })
    }
}

/// 规则注册键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterlockKey {
    pub device_type: DeviceType,
    pub purpose: DevicePurpose,
    pub action: DeviceAction,
}

impl InterlockKey {
    pub fn new(class: DeviceClass, action: DeviceAction) -> Self {
        Self {
            device_type: class.device_type,
            purpose: class.purpose,
            action,
        }
    }
}

/// 联锁引擎（规则注册表）。
#[derive(Default, Clone)]
pub struct InterlockEngine {
    rules: HashMap<InterlockKey, Vec<Arc<dyn InterlockRule>>>,
}

impl InterlockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置规则：清水泵 ON 检查水箱水量，排水阀 OPEN 检查水体 pH。
    pub fn with_defaults(config: &InterlockConfig) -> Self {
        let mut engine = Self::new();
        engine.register(
            DeviceClass::new(DeviceType::Pump, DevicePurpose::Water),
            DeviceAction::On,
            Arc::new(TankLevelRule {
                min_volume: config.min_tank_water_volume,
            }),
        );
        engine.register(
            DeviceClass::new(DeviceType::Valve, DevicePurpose::Drain),
            DeviceAction::Open,
            Arc::new(DrainPhRule {
                min_ph: config.drain_ph_min,
                max_ph: config.drain_ph_max,
            }),
        );
        engine
    }

    pub fn register(
        &mut self,
        class: DeviceClass,
        action: DeviceAction,
        rule: Arc<dyn InterlockRule>,
    ) {
        self.rules
            .entry(InterlockKey::new(class, action))
            .or_default()
            .push(rule);
    }

    /// 注册在该组合上的规则名。
    pub fn rule_names(&self, class: DeviceClass, action: DeviceAction) -> Vec<&'static str> {
        self.rules
            .get(&InterlockKey::new(class, action))
            .map(|rules| rules.iter().map(|rule| rule.name()).collect())
            .unwrap_or_default()
    }

    pub fn check_interlock(
        &self,
        device: &DeviceRecord,
        action: DeviceAction,
        latest: Option<&SensorReading>,
    ) -> InterlockVerdict {
        self.check_class(device.class(), action, latest)
    }

    pub fn check_class(
        &self,
        class: DeviceClass,
        action: DeviceAction,
        latest: Option<&SensorReading>,
    ) -> InterlockVerdict {
        let mut verdict = InterlockVerdict::allowed();
        let Some(reading) = latest else {
            verdict.conditions.insert(
                "warning".to_string(),
                serde_json::Value::String(NO_SENSOR_DATA_WARNING.to_string()),
            );
            return verdict;
        };
        let Some(rules) = self.rules.get(&InterlockKey::new(class, action)) else {
            return verdict;
        };
        for rule in rules {
            if let Some(block) = rule.check(reading) {
                verdict.block(block);
            }
        }
        verdict
    }
}
