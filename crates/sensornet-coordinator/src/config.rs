//! Coordinator configuration.

use serde::{Deserialize, Serialize};
use sensornet_packet::DEFAULT_SENSOR_COUNT;

use crate::{CoordinatorError, Result};

/// Default time a request may stay outstanding, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Coordinator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Slots in the sensor table, including slot 0 for the master.
    pub sensor_count: usize,
    /// Time after which an outstanding request is abandoned.
    pub timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            sensor_count: DEFAULT_SENSOR_COUNT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CoordinatorConfig {
    /// Request timeout.
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.timeout_ms.min(i64::MAX as u64) as i64)
    }

    /// Check that the table has room for the master and at least one
    /// sensor, and no more slots than device ids.
    pub fn validate(&self) -> Result<()> {
        if self.sensor_count < 2 || self.sensor_count > usize::from(u8::MAX) + 1 {
            return Err(CoordinatorError::InvalidConfig(format!(
                "sensor_count must be between 2 and 256, got {}",
                self.sensor_count
            )));
        }
        Ok(())
    }
}
