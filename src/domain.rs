//! ==============================================================================
//! domain.rs - Core Data Types
//! ==============================================================================
//!
//! purpose:
//!     the values that flow through one sampling cycle:
//!     Reading (decoded frame) -> AirQualityIndex (value + AqiLevel).
//!
//! relationships:
//!     - produced by: frame.rs (Reading), aqi.rs (AirQualityIndex)
//!     - consumed by: alert.rs, monitor.rs, telemetry labels
//!
//! ==============================================================================

use std::fmt;

/// one decoded sample, in µg/m³
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    pub pm1: u16,
    pub pm2_5: u16,
    pub pm10: u16,
}

/// qualitative air quality level
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AqiLevel {
    Good,
    Moderate,
    UnhealthyForSome,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    /// pm2.5 outside the approximation model (aqi sentinel 999)
    SensorFault,
}

impl AqiLevel {
    /// label written to the level channel and used in notifications
    pub fn label(&self) -> &'static str {
        match self {
            AqiLevel::Good => "GOOD",
            AqiLevel::Moderate => "MODERATE",
            AqiLevel::UnhealthyForSome => "UNHEALTHY FOR SOME",
            AqiLevel::Unhealthy => "UNHEALTHY",
            AqiLevel::VeryUnhealthy => "VERY UNHEALTHY",
            AqiLevel::Hazardous => "HAZARDOUS",
            AqiLevel::SensorFault => "SENSOR FAULT",
        }
    }
}

impl fmt::Display for AqiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// derived index for a reading
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AirQualityIndex {
    /// 0..=300 in-model, 999 = sentinel
    pub value: u16,
    pub level: AqiLevel,
}
