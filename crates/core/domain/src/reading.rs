//! 传感器读数与指标目录。

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 可用于告警规则的数值型传感器指标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMetric {
    Temperature,
    Humidity,
    UvIntensity,
    Rainfall,
    SoilMoistureLevel,
    SoilTemperature,
    PhLevel,
    SoilEc,
    SoilSapMoisture,
    TankWaterVolume,
    DirtyTankVolume,
    PumpPressure,
    WaterTreatmentRate,
    WaterTemperature,
    WaterPh,
    WaterEc,
    WaterTds,
    WaterFlowRate,
    WaterTurbidity,
    WaterOrp,
    WaterDo,
    LightPar,
    Co2Concentration,
    AirTemperature,
    AtmosphericPressure,
    WindSpeed,
    CleanWaterProcessed,
    UsedWaterProcessed,
    SystemPowerUsage,
    BatteryLevel,
}

/// 读数中存在但不是数值的字段，不能作为规则指标。
const NON_NUMERIC_FIELDS: &[&str] = &["soil_npk", "wind_direction"];

impl SensorMetric {
    pub const ALL: [SensorMetric; 30] = [
        SensorMetric::Temperature,
        SensorMetric::Humidity,
        SensorMetric::UvIntensity,
        SensorMetric::Rainfall,
        SensorMetric::SoilMoistureLevel,
        SensorMetric::SoilTemperature,
        SensorMetric::PhLevel,
        SensorMetric::SoilEc,
        SensorMetric::SoilSapMoisture,
        SensorMetric::TankWaterVolume,
        SensorMetric::DirtyTankVolume,
        SensorMetric::PumpPressure,
        SensorMetric::WaterTreatmentRate,
        SensorMetric::WaterTemperature,
        SensorMetric::WaterPh,
        SensorMetric::WaterEc,
        SensorMetric::WaterTds,
        SensorMetric::WaterFlowRate,
        SensorMetric::WaterTurbidity,
        SensorMetric::WaterOrp,
        SensorMetric::WaterDo,
        SensorMetric::LightPar,
        SensorMetric::Co2Concentration,
        SensorMetric::AirTemperature,
        SensorMetric::AtmosphericPressure,
        SensorMetric::WindSpeed,
        SensorMetric::CleanWaterProcessed,
        SensorMetric::UsedWaterProcessed,
        SensorMetric::SystemPowerUsage,
        SensorMetric::BatteryLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorMetric::Temperature => "temperature",
            SensorMetric::Humidity => "humidity",
            SensorMetric::UvIntensity => "uv_intensity",
            SensorMetric::Rainfall => "rainfall",
            SensorMetric::SoilMoistureLevel => "soil_moisture_level",
            SensorMetric::SoilTemperature => "soil_temperature",
            SensorMetric::PhLevel => "ph_level",
            SensorMetric::SoilEc => "soil_ec",
            SensorMetric::SoilSapMoisture => "soil_sap_moisture",
            SensorMetric::TankWaterVolume => "tank_water_volume",
            SensorMetric::DirtyTankVolume => "dirty_tank_volume",
            SensorMetric::PumpPressure => "pump_pressure",
            SensorMetric::WaterTreatmentRate => "water_treatment_rate",
            SensorMetric::WaterTemperature => "water_temperature",
            SensorMetric::WaterPh => "water_ph",
            SensorMetric::WaterEc => "water_ec",
            SensorMetric::WaterTds => "water_tds",
            SensorMetric::WaterFlowRate => "water_flow_rate",
            SensorMetric::WaterTurbidity => "water_turbidity",
            SensorMetric::WaterOrp => "water_orp",
            SensorMetric::WaterDo => "water_do",
            SensorMetric::LightPar => "light_par",
            SensorMetric::Co2Concentration => "co2_concentration",
            SensorMetric::AirTemperature => "air_temperature",
            SensorMetric::AtmosphericPressure => "atmospheric_pressure",
            SensorMetric::WindSpeed => "wind_speed",
            SensorMetric::CleanWaterProcessed => "clean_water_processed",
            SensorMetric::UsedWaterProcessed => "used_water_processed",
            SensorMetric::SystemPowerUsage => "system_power_usage",
            SensorMetric::BatteryLevel => "battery_level",
        }
    }
}

impl fmt::Display for SensorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorMetric {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim().to_ascii_lowercase();
        if let Some(metric) = SensorMetric::ALL
            .iter()
            .copied()
            .find(|metric| metric.as_str() == name)
        {
            return Ok(metric);
        }
        if NON_NUMERIC_FIELDS.contains(&name.as_str()) {
            return Err(DomainError::NonNumericMetric(name));
        }
        Err(DomainError::UnknownMetric(value.to_string()))
    }
}

/// 一次传感器采样快照。
///
/// 不在 `metrics` 中的指标视为缺失（传感器离线）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub reading_id: String,
    pub ts_ms: i64,
    pub metrics: BTreeMap<SensorMetric, f64>,
}

impl SensorReading {
    pub fn new(reading_id: impl Into<String>, ts_ms: i64) -> Self {
        Self {
            reading_id: reading_id.into(),
            ts_ms,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, metric: SensorMetric, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    /// 读取指标值；非有限值（NaN / 无穷）按缺失处理。
    pub fn value(&self, metric: SensorMetric) -> Option<f64> {
        self.metrics
            .get(&metric)
            .copied()
            .filter(|value| value.is_finite())
    }
}
