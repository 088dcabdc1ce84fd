use serde::{Deserialize, Serialize};

use super::Power;

/// Identifier of a metering sensor
pub type SensorId = i64;

/// A single power sample recorded by a sensor.
///
/// `sequence_id` is unique and increasing per sensor; `timestamp` is seconds
/// since the epoch and is neither unique nor guaranteed monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: SensorId,
    pub sequence_id: i64,
    pub timestamp: i64,
    /// Instantaneous power in watts
    pub value: f64,
}

impl Reading {
    pub fn power(&self) -> Power {
        Power::watts(self.value)
    }
}

/// A metering sensor and the kind of quantity it measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
    #[serde(rename = "type_id")]
    pub measure_type_id: i64,
    #[serde(rename = "type")]
    pub measure_type_name: String,
}
