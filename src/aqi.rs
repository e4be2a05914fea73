//! ==============================================================================
//! aqi.rs - PM2.5 to AQI approximation
//! ==============================================================================
//!
//! purpose:
//!     maps a PM2.5 concentration to an AQI value and level with a
//!     three-piece curve fitted to the airnow.gov calculator:
//!
//!         pm2.5 0-55:     aqi = 6.49 * pm2.5^0.778
//!         pm2.5 55-150:   aqi = 0.518 * pm2.5 + 122
//!         pm2.5 150-250:  aqi = pm2.5 + 50
//!         pm2.5 > 250:    aqi = 999 (sentinel, out of model)
//!
//!     lower pieces are inclusive of their upper boundary.
//!
//! rounding:
//!     f64::round (half away from zero). inputs are never negative so this
//!     is plain round-half-up.
//!
//! ==============================================================================

use crate::domain::{AirQualityIndex, AqiLevel};

/// aqi reported for concentrations above the fitted range
pub const SENSOR_FAULT_AQI: u16 = 999;

pub fn compute_aqi(pm2_5: u16) -> AirQualityIndex {
    let pm = f64::from(pm2_5);
    let value = match pm2_5 {
        0..=55 => (6.49 * pm.powf(0.778)).round() as u16,
        56..=150 => (0.518 * pm + 122.0).round() as u16,
        151..=250 => pm2_5 + 50,
        _ => SENSOR_FAULT_AQI,
    };

    AirQualityIndex { value, level: classify(value) }
}

/// step function from aqi to level. 301..=998 is HAZARDOUS, only the
/// sentinel itself (or anything above it) is SENSOR FAULT.
pub fn classify(aqi: u16) -> AqiLevel {
    match aqi {
        0..=50 => AqiLevel::Good,
        51..=100 => AqiLevel::Moderate,
        101..=150 => AqiLevel::UnhealthyForSome,
        151..=200 => AqiLevel::Unhealthy,
        201..=300 => AqiLevel::VeryUnhealthy,
        301..=998 => AqiLevel::Hazardous,
        _ => AqiLevel::SensorFault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_piece_values() {
        let expected = [
            (0, 0),
            (1, 6),
            (2, 11),
            (5, 23),
            (7, 29),
            (10, 39),
            (12, 45),
            (13, 48),
            (20, 67),
            (30, 92),
            (35, 103),
            (40, 114),
            (54, 145),
            (55, 147),
        ];
        for (pm, aqi) in expected {
            assert_eq!(compute_aqi(pm).value, aqi, "pm2.5 = {}", pm);
        }
    }

    #[test]
    fn test_linear_pieces() {
        assert_eq!(compute_aqi(56).value, 151);
        assert_eq!(compute_aqi(100).value, 174);
        assert_eq!(compute_aqi(150).value, 200);
        assert_eq!(compute_aqi(151).value, 201);
        assert_eq!(compute_aqi(200).value, 250);
        assert_eq!(compute_aqi(250).value, 300);
    }

    #[test]
    fn test_no_large_jump_at_piece_boundaries() {
        for boundary in [55u16, 150, 250] {
            let below = compute_aqi(boundary).value;
            let above = compute_aqi(boundary + 1).value;
            if above == SENSOR_FAULT_AQI {
                continue;
            }
            assert!(above >= below, "not monotonic at {}", boundary);
            assert!(above - below <= 5, "jump of {} at {}", above - below, boundary);
        }
    }

    #[test]
    fn test_out_of_model_is_sentinel() {
        for pm in [251u16, 300, 1000, u16::MAX] {
            let index = compute_aqi(pm);
            assert_eq!(index, AirQualityIndex { value: 999, level: AqiLevel::SensorFault });
        }
    }

    #[test]
    fn test_classify_inclusive_upper_bounds() {
        assert_eq!(classify(0), AqiLevel::Good);
        assert_eq!(classify(50), AqiLevel::Good);
        assert_eq!(classify(51), AqiLevel::Moderate);
        assert_eq!(classify(100), AqiLevel::Moderate);
        assert_eq!(classify(101), AqiLevel::UnhealthyForSome);
        assert_eq!(classify(150), AqiLevel::UnhealthyForSome);
        assert_eq!(classify(151), AqiLevel::Unhealthy);
        assert_eq!(classify(200), AqiLevel::Unhealthy);
        assert_eq!(classify(201), AqiLevel::VeryUnhealthy);
        assert_eq!(classify(300), AqiLevel::VeryUnhealthy);
        assert_eq!(classify(301), AqiLevel::Hazardous);
        assert_eq!(classify(998), AqiLevel::Hazardous);
        assert_eq!(classify(999), AqiLevel::SensorFault);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let mut previous = classify(0);
        for aqi in 1..=1000u16 {
            let level = classify(aqi);
            assert!(level >= previous, "level went down at {}", aqi);
            previous = level;
        }
    }

    #[test]
    fn test_pm_30_end_to_end_value() {
        let index = compute_aqi(30);
        assert_eq!(index.value, 92);
        assert_eq!(index.level, AqiLevel::Moderate);
        assert_eq!(index.level.label(), "MODERATE");
    }
}
