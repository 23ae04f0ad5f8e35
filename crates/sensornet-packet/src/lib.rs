//! Packet types for the sensornet telemetry protocol.
//!
//! A [`Packet`] is the logical unit carried inside every frame on the radio
//! link, regardless of which framing variant moved it across the serial
//! line:
//!
//! ```text
//! +----+------+-------------------+
//! | op | from | data[0..=68]      |
//! +----+------+-------------------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use sensornet_packet::{DeviceId, OpCode, Packet};
//!
//! let packet = Packet::new(OpCode::MeasureResponse, DeviceId::new(2), b"0080").unwrap();
//! assert_eq!(packet.op(), OpCode::MeasureResponse);
//! assert_eq!(sensornet_packet::decode_reading(packet.data()), 0x80);
//! ```

mod constants;
mod error;
mod packet;
mod reading;
mod types;

pub use constants::*;
pub use error::*;
pub use packet::*;
pub use reading::*;
pub use types::*;
