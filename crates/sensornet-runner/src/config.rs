//! Node configuration file.
//!
//! ```yaml
//! transport:
//!   kind: thread_backed
//!   device: /dev/ttyUSB0
//! link:
//!   mode: at
//! coordinator:
//!   sensor_count: 5
//!   timeout_ms: 1000
//! ```

use sensornet_codec::FrameMode;
use sensornet_coordinator::CoordinatorConfig;
use sensornet_link::LinkConfig;
use sensornet_transport::{TransportConfig, TransportKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, RunnerError};

/// Everything a node needs to start. Missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Serial device and receive path.
    pub transport: TransportConfig,
    /// Framing mode and radio identity.
    pub link: LinkConfig,
    /// Sensor table and timeouts; only the master reads it.
    pub coordinator: CoordinatorConfig,
}

/// Values given on the command line, which win over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replaces `transport.device`.
    pub device: Option<PathBuf>,
    /// Replaces `link.mode`.
    pub mode: Option<FrameMode>,
    /// Replaces `transport.kind`.
    pub transport: Option<TransportKind>,
}

impl RunnerConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: RunnerConfig = serde_yaml::from_str(yaml)?;
        config.coordinator.validate()?;
        Ok(config)
    }

    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(RunnerConfig::default());
        };
        let yaml = std::fs::read_to_string(path).map_err(|source| RunnerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(device) = overrides.device {
            self.transport.device = device;
        }
        if let Some(mode) = overrides.mode {
            self.link.mode = mode;
        }
        if let Some(kind) = overrides.transport {
            self.transport.kind = kind;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensornet_codec::api_mode::Addressing;
    use sensornet_packet::DeviceId;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = RunnerConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.link.device_id, DeviceId::MASTER);
        assert_eq!(config.coordinator.timeout_ms, 1000);
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
transport:
  kind: interrupt_backed
  device: /dev/ttyUSB1
  queue_capacity: 32
link:
  mode: at
  device_id: 3
  addressing: coordinator
coordinator:
  sensor_count: 9
  timeout_ms: 250
"#;
        let config = RunnerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.transport.kind, TransportKind::InterruptBacked);
        assert_eq!(config.transport.device, PathBuf::from("/dev/ttyUSB1"));
        assert_eq!(config.transport.capacity(), 32);
        assert_eq!(config.link.mode, FrameMode::At);
        assert_eq!(config.link.device_id, DeviceId::new(3));
        assert_eq!(config.link.addressing, Addressing::Coordinator);
        assert_eq!(config.coordinator.sensor_count, 9);
        assert_eq!(config.coordinator.timeout_ms, 250);
    }

    #[test]
    fn test_invalid_sensor_count_rejected() {
        let err = RunnerConfig::from_yaml_str("coordinator:\n  sensor_count: 1\n").unwrap_err();
        assert!(matches!(err, RunnerError::Coordinator(_)));
    }

    #[test]
    fn test_overrides_win() {
        let config = RunnerConfig::default().with_overrides(ConfigOverrides {
            device: Some(PathBuf::from("/dev/ttyS3")),
            mode: Some(FrameMode::At),
            transport: None,
        });
        assert_eq!(config.transport.device, PathBuf::from("/dev/ttyS3"));
        assert_eq!(config.link.mode, FrameMode::At);
        assert_eq!(config.transport.kind, TransportKind::ThreadBacked);
    }

    #[test]
    fn test_missing_file() {
        let err = RunnerConfig::load(Some(Path::new("/nonexistent/sensornet.yaml"))).unwrap_err();
        assert!(matches!(err, RunnerError::ConfigRead { .. }));
    }
}
