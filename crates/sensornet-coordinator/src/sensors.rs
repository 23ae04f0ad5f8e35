//! Per-sensor readings and calibration, one lock per sensor.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use sensornet_packet::DeviceId;

/// Latest reading from a sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorResult {
    /// Raw reading as decoded from the response payload.
    pub value: u32,
    /// When the reading arrived; `None` until the first one.
    pub observed_at: Option<DateTime<Utc>>,
    /// True once a reading has been stored.
    pub valid: bool,
}

/// Calibration state of a sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorConfig {
    /// Zero-point baseline subtracted from raw readings.
    pub offset: u32,
    /// Set once the sensor has reported since the current calibration round began.
    pub calibrated: bool,
}

/// Result and configuration of one sensor, guarded together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorSlot {
    /// Latest reading.
    pub result: SensorResult,
    /// Calibration.
    pub config: SensorConfig,
}

impl SensorSlot {
    /// Raw reading minus offset.
    pub fn corrected(&self) -> i64 {
        i64::from(self.result.value) - i64::from(self.config.offset)
    }
}

/// Fixed table of sensor slots indexed by device id. Slot 0 belongs to the
/// master and never receives readings.
#[derive(Debug)]
pub struct SensorTable {
    slots: Vec<Mutex<SensorSlot>>,
}

impl SensorTable {
    /// Table with `count` empty slots.
    pub fn new(count: usize) -> Self {
        SensorTable {
            slots: (0..count).map(|_| Mutex::new(SensorSlot::default())).collect(),
        }
    }

    /// Number of slots, including the master's.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if `id` names a sensor slot (not the master, not out of range).
    pub fn is_sensor(&self, id: DeviceId) -> bool {
        !id.is_master() && id.index() < self.slots.len()
    }

    /// Lock one slot.
    pub fn lock(&self, id: DeviceId) -> Option<MutexGuard<'_, SensorSlot>> {
        self.slots.get(id.index()).map(|slot| slot.lock())
    }

    /// Copy of one slot.
    pub fn get(&self, id: DeviceId) -> Option<SensorSlot> {
        self.lock(id).map(|slot| *slot)
    }

    /// Clear the calibrated flag of every sensor. Locks slots in ascending order.
    pub fn reset_calibration(&self) {
        for slot in self.slots.iter().skip(1) {
            slot.lock().config.calibrated = false;
        }
    }

    /// Returns true if every sensor has reported since calibration began.
    pub fn all_calibrated(&self) -> bool {
        self.slots.iter().skip(1).all(|slot| slot.lock().config.calibrated)
    }

    /// Number of sensors currently marked calibrated.
    pub fn calibrated_count(&self) -> usize {
        self.slots
            .iter()
            .skip(1)
            .filter(|slot| slot.lock().config.calibrated)
            .count()
    }

    /// Copy every slot, locking each in turn.
    pub fn snapshot(&self) -> Vec<SensorSlot> {
        self.slots.iter().map(|slot| *slot.lock()).collect()
    }
}
