//! Sensor data report.

use serde::{Deserialize, Serialize};

use crate::{Result, SensorSlot};

/// Raw units per kilogram of load.
pub const RAW_UNITS_PER_KG: f64 = 41.0;

/// Convert an offset-corrected reading to kilograms, rounded to two decimals.
pub fn convert_sensor_value(corrected: i64) -> f64 {
    let kg = corrected as f64 / RAW_UNITS_PER_KG;
    (kg * 100.0).round() / 100.0
}

/// One sensor's entry in a [`DataReport`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    /// Raw reading minus offset.
    pub value: i64,
    /// `value` in kilograms.
    pub converted: f64,
    /// Unix time of the reading in seconds, 0 if none has arrived.
    pub time: i64,
    /// Calibration offset.
    pub offset: u32,
}

impl From<&SensorSlot> for SensorReport {
    fn from(slot: &SensorSlot) -> Self {
        let value = slot.corrected();
        SensorReport {
            value,
            converted: convert_sensor_value(value),
            time: slot.result.observed_at.map_or(0, |t| t.timestamp()),
            offset: slot.config.offset,
        }
    }
}

/// Snapshot of every sensor slot, including the master's slot 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataReport {
    /// One entry per slot, indexed by device id.
    pub sensors: Vec<SensorReport>,
}

impl DataReport {
    /// Build a report from slot copies.
    pub fn from_slots(slots: &[SensorSlot]) -> Self {
        DataReport {
            sensors: slots.iter().map(SensorReport::from).collect(),
        }
    }

    /// Serialize as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SensorConfig, SensorResult};
    use chrono::DateTime;

    #[test]
    fn test_convert_rounds_to_two_decimals() {
        assert_eq!(convert_sensor_value(0), 0.0);
        assert_eq!(convert_sensor_value(41), 1.0);
        assert_eq!(convert_sensor_value(100), 2.44);
        assert_eq!(convert_sensor_value(-82), -2.0);
    }

    #[test]
    fn test_json_shape() {
        let observed = SensorSlot {
            result: SensorResult {
                value: 0x0123,
                observed_at: DateTime::from_timestamp(1_400_000_000, 0),
                valid: true,
            },
            config: SensorConfig {
                offset: 0x0100,
                calibrated: true,
            },
        };
        let report = DataReport::from_slots(&[SensorSlot::default(), observed]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sensors": [
                    {"value": 0, "converted": 0.0, "time": 0, "offset": 0},
                    {"value": 35, "converted": 0.85, "time": 1_400_000_000, "offset": 256}
                ]
            })
        );
    }
}
