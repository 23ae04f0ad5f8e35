//! Single-letter command consoles for the master and sensor nodes.

use sensornet_codec::FrameMode;
use sensornet_coordinator::Coordinator;
use sensornet_link::PacketLink;
use sensornet_transport::ByteTransport;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

use crate::{Result, SensorNode};

/// A master console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `m`: broadcast a measure request.
    Measure,
    /// `c`: start a calibration round.
    Calibrate,
    /// `d`: print the sensor data report.
    Data,
    /// `p`: broadcast a ping.
    Ping,
    /// `I`: ask the radio for its node identifier.
    NodeIdentity,
    /// `D`: ask the radio to discover its neighbours.
    NodeDiscovery,
    /// `q`: leave the console.
    Quit,
}

impl Command {
    /// Map a letter to a command. Case matters.
    pub fn from_char(c: char) -> Option<Command> {
        Some(match c {
            'm' => Command::Measure,
            'c' => Command::Calibrate,
            'd' => Command::Data,
            'p' => Command::Ping,
            'I' => Command::NodeIdentity,
            'D' => Command::NodeDiscovery,
            'q' => Command::Quit,
            _ => return None,
        })
    }
}

/// How one input character is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A letter naming a command.
    Command(Command),
    /// Whitespace, digits and punctuation.
    Ignored,
    /// A letter that names no command.
    Unknown(char),
}

impl Input {
    /// Classify one character read from the console.
    pub fn classify(c: char) -> Input {
        if !c.is_ascii_alphabetic() {
            return Input::Ignored;
        }
        Command::from_char(c).map_or(Input::Unknown(c), Input::Command)
    }
}

/// Radio-level commands the console can issue.
pub trait RadioControl {
    /// Query the node identifier (`NI`).
    fn node_identity(&self) -> sensornet_link::Result<()>;

    /// Start node discovery (`ND`).
    fn node_discovery(&self) -> sensornet_link::Result<()>;
}

impl<T: ByteTransport> RadioControl for PacketLink<T> {
    fn node_identity(&self) -> sensornet_link::Result<()> {
        radio_command(self, *b"NI")
    }

    fn node_discovery(&self) -> sensornet_link::Result<()> {
        radio_command(self, *b"ND")
    }
}

/// In AT mode the radio only takes commands in command mode, so wrap the
/// command in `+++` ... `ATCN`. The reply arrives as plain words.
fn radio_command<T: ByteTransport>(link: &PacketLink<T>, command: [u8; 2]) -> sensornet_link::Result<()> {
    match link.mode() {
        FrameMode::At => {
            link.enter_command_mode()?;
            link.send_command(command, None)?;
            link.exit_command_mode()
        }
        FrameMode::Api => link.send_command(command, None),
    }
}

/// Whether the console keeps reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Stop reading.
    Quit,
}

/// Dispatches master commands to the coordinator and radio.
pub struct MasterConsole<'a, R: ?Sized> {
    coordinator: &'a Coordinator,
    radio: &'a R,
}

impl<'a, R: RadioControl + ?Sized> MasterConsole<'a, R> {
    /// Console driving `coordinator` and `radio`.
    pub fn new(coordinator: &'a Coordinator, radio: &'a R) -> Self {
        MasterConsole { coordinator, radio }
    }

    /// Run one command, writing its reply to `out`.
    pub fn execute<W: Write>(&self, command: Command, out: &mut W) -> Result<Flow> {
        debug!(?command, "console command");
        let request = match command {
            Command::Measure => self.coordinator.request_measure(),
            Command::Calibrate => self.coordinator.request_calibrate(),
            Command::Ping => self.coordinator.request_ping(),
            Command::Data => {
                writeln!(out, "{}", self.coordinator.data_json()?)?;
                return Ok(Flow::Continue);
            }
            Command::NodeIdentity | Command::NodeDiscovery => {
                let sent = if command == Command::NodeIdentity {
                    self.radio.node_identity()
                } else {
                    self.radio.node_discovery()
                };
                if let Err(e) = sent {
                    warn!(?command, error = %e, "radio command failed");
                    writeln!(out, "radio command failed: {}", e)?;
                }
                return Ok(Flow::Continue);
            }
            Command::Quit => return Ok(Flow::Quit),
        };

        match request {
            Ok(status) => writeln!(out, "{}", status)?,
            Err(e) => writeln!(out, "request failed: {}", e)?,
        }
        Ok(Flow::Continue)
    }

    /// Read commands until `q` or end of input.
    pub fn run<B: BufRead, W: Write>(&self, input: B, out: &mut W) -> Result<()> {
        for line in input.lines() {
            for c in line?.chars() {
                match Input::classify(c) {
                    Input::Ignored => {}
                    Input::Unknown(c) => writeln!(out, "unknown command {}", c)?,
                    Input::Command(command) => {
                        if self.execute(command, out)? == Flow::Quit {
                            return Ok(());
                        }
                    }
                }
            }
            out.flush()?;
        }
        Ok(())
    }
}

/// Sensor console: a number sets the simulated reading (decimal, or hex
/// with `0x`), `q` quits.
pub fn run_sensor_console<B: BufRead, W: Write>(node: &SensorNode, input: B, out: &mut W) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let word = line.trim();
        if word.is_empty() {
            continue;
        }
        if word == "q" {
            break;
        }
        match parse_reading(word) {
            Some(value) => {
                node.set_reading(value);
                writeln!(out, "reading {:#06x}", value)?;
            }
            None => writeln!(out, "unknown command {}", word)?,
        }
        out.flush()?;
    }
    Ok(())
}

/// Parse a 16-bit reading, decimal or `0x` hex.
pub fn parse_reading(text: &str) -> Option<u16> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
