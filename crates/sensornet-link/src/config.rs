//! Link configuration.

use sensornet_codec::api_mode::Addressing;
use sensornet_codec::FrameMode;
use sensornet_packet::DeviceId;
use serde::{Deserialize, Serialize};

/// How this device frames packets and whom it sends them to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Framing variant the radio is configured for.
    pub mode: FrameMode,
    /// Identity written into outgoing packets.
    pub device_id: DeviceId,
    /// Destination of outgoing packets in API mode.
    pub addressing: Addressing,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::master()
    }
}

impl LinkConfig {
    /// The master unit: device 0, broadcasting to every sensor.
    pub fn master() -> Self {
        LinkConfig {
            mode: FrameMode::default(),
            device_id: DeviceId::MASTER,
            addressing: Addressing::Broadcast,
        }
    }

    /// A sensor unit, answering the coordinator only.
    pub fn sensor(device_id: DeviceId) -> Self {
        LinkConfig {
            mode: FrameMode::default(),
            device_id,
            addressing: Addressing::Coordinator,
        }
    }

    /// Same configuration with a different framing variant.
    pub fn with_mode(mut self, mode: FrameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Metric/log role name for this device.
    pub fn role(&self) -> &'static str {
        if self.device_id.is_master() {
            "master"
        } else {
            "sensor"
        }
    }
}
