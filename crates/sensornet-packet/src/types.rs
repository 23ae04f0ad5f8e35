//! Operation codes and device identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation code carried in the first byte of every packet.
///
/// Unknown values are kept as [`OpCode::Unknown`] so that the codecs can
/// pass them through; it is up to the consumer to treat them as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Liveness check.
    Ping,
    /// Answer to [`OpCode::Ping`], also sent unsolicited by a sensor on start-up.
    Pong,
    /// Master asks every sensor for a reading.
    MeasureRequest,
    /// Sensor reading, payload is ASCII hex digits.
    MeasureResponse,
    /// Any other value.
    Unknown(u8),
}

impl OpCode {
    /// Returns the wire value of this operation.
    pub const fn as_u8(self) -> u8 {
        match self {
            OpCode::Ping => 0x00,
            OpCode::Pong => 0x01,
            OpCode::MeasureRequest => 0x10,
            OpCode::MeasureResponse => 0x20,
            OpCode::Unknown(v) => v,
        }
    }

    /// Returns true if this is one of the four defined operations.
    pub const fn is_known(self) -> bool {
        !matches!(self, OpCode::Unknown(_))
    }
}

impl From<u8> for OpCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => OpCode::Ping,
            0x01 => OpCode::Pong,
            0x10 => OpCode::MeasureRequest,
            0x20 => OpCode::MeasureResponse,
            other => OpCode::Unknown(other),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op.as_u8()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCode::Ping => write!(f, "PING"),
            OpCode::Pong => write!(f, "PONG"),
            OpCode::MeasureRequest => write!(f, "MEASURE_REQUEST"),
            OpCode::MeasureResponse => write!(f, "MEASURE_RESPONSE"),
            OpCode::Unknown(v) => write!(f, "UNKNOWN(0x{v:02X})"),
        }
    }
}

/// Application level device identifier.
///
/// `0` is the master unit, `1..N` are sensors. This has no relation to the
/// network or hardware address of the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(u8);

impl DeviceId {
    /// The master unit.
    pub const MASTER: DeviceId = DeviceId(0);

    /// Create a device id from its raw value.
    pub const fn new(id: u8) -> Self {
        DeviceId(id)
    }

    /// Returns the raw value.
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns the value as a sensor table index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true for the master unit.
    pub const fn is_master(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for DeviceId {
    fn from(value: u8) -> Self {
        DeviceId(value)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
