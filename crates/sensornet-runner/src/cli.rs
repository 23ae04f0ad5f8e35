//! Command-line interface.

use clap::{Args, Parser, Subcommand};
use sensornet_codec::FrameMode;
use sensornet_link::LinkConfig;
use sensornet_packet::DeviceId;
use sensornet_transport::TransportKind;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

use crate::{ConfigOverrides, MasterConsole, MasterNode, Result, RunnerConfig, RunnerError, SensorNode};

#[derive(Debug, Parser)]
#[command(name = "sensornet", version, about = "Master console and sensor simulator for a sensornet radio network")]
pub struct Cli {
    /// Log filter, e.g. `debug` or `sensornet_link=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: NodeCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Run the master unit, reading single-letter commands from stdin
    /// (m measure, c calibrate, d data, p ping, I identity, D discovery, q quit)
    Master {
        #[command(flatten)]
        node: NodeArgs,
    },
    /// Simulate a sensor unit. Type a number to change the reading, q to quit
    Sensor {
        #[command(flatten)]
        node: NodeArgs,

        /// Device id of this sensor (1-255)
        #[arg(long)]
        device_id: u8,

        /// Initial reading
        #[arg(long, default_value_t = 0)]
        value: u16,
    },
}

/// Options shared by both node kinds.
#[derive(Debug, Clone, Args)]
pub struct NodeArgs {
    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial device of the radio
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Radio framing: at or api
    #[arg(long)]
    pub mode: Option<FrameMode>,

    /// Receive path: thread or interrupt
    #[arg(long)]
    pub transport: Option<TransportKind>,
}

impl NodeArgs {
    /// Load the config file and apply the flags on top.
    pub fn load_config(&self) -> Result<RunnerConfig> {
        let config = RunnerConfig::load(self.config.as_deref())?;
        Ok(config.with_overrides(ConfigOverrides {
            device: self.device.clone(),
            mode: self.mode,
            transport: self.transport,
        }))
    }
}

/// Run the selected node until its console ends.
pub fn run(command: NodeCommand) -> Result<()> {
    sensornet_metrics::describe_metrics();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    match command {
        NodeCommand::Master { node } => {
            let config = node.load_config()?;
            let master = MasterNode::start(&config)?;
            let result = MasterConsole::new(master.coordinator().as_ref(), master.link())
                .run(stdin.lock(), &mut stdout);
            master.shutdown()?;
            result
        }
        NodeCommand::Sensor {
            node,
            device_id,
            value,
        } => {
            if device_id == 0 {
                return Err(RunnerError::InvalidArgument(
                    "--device-id must be between 1 and 255".to_string(),
                ));
            }
            let mut config = node.load_config()?;
            let mode = config.link.mode;
            config.link = LinkConfig {
                mode,
                ..LinkConfig::sensor(DeviceId::new(device_id))
            };
            let sensor = SensorNode::start(&config, value)?;
            writeln!(stdout, "sensor {} up, reading {:#06x}", sensor.device_id(), value)?;
            let result = crate::run_sensor_console(&sensor, stdin.lock(), &mut stdout);
            let stats = sensor.shutdown()?;
            info!(answered = stats.valid_packets, "sensor stopped");
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_flags() {
        let cli = Cli::try_parse_from([
            "sensornet",
            "master",
            "--device",
            "/dev/ttyUSB0",
            "--mode",
            "at",
            "--transport",
            "interrupt",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let NodeCommand::Master { node } = cli.command else {
            panic!("expected master");
        };
        let config = node.load_config().unwrap();
        assert_eq!(config.transport.device, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(config.link.mode, FrameMode::At);
        assert_eq!(config.transport.kind, TransportKind::InterruptBacked);
    }

    #[test]
    fn test_sensor_flags() {
        let cli = Cli::try_parse_from(["sensornet", "sensor", "--device-id", "4", "--value", "291"]).unwrap();
        match cli.command {
            NodeCommand::Sensor { device_id, value, node } => {
                assert_eq!(device_id, 4);
                assert_eq!(value, 291);
                assert!(node.config.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_mode() {
        assert!(Cli::try_parse_from(["sensornet", "master", "--mode", "xbee"]).is_err());
        assert!(Cli::try_parse_from(["sensornet", "sensor"]).is_err());
    }
}
