//! Frame codecs for the sensornet radio link.
//!
//! Two framing variants carry the same logical [`Packet`](sensornet_packet::Packet):
//!
//! - [`at_mode`]: the radio runs in transparent mode and frames are
//!   delimited, length-prefixed and checksummed, with no escaping.
//! - [`api_mode`]: the radio runs in escaped API mode and packets travel
//!   inside transmit-request / receive-packet API frames.
//!
//! Both parsers are byte-at-a-time state machines implementing
//! [`FrameParser`]. Both encoders are stateless apart from the sender
//! identity and addressing, and implement [`FrameEncoder`].
//!
//! # Example
//!
//! ```rust
//! use sensornet_codec::{FrameEncoder, FrameParser, ParseEvent};
//! use sensornet_codec::at_mode::{AtEncoder, AtParser};
//! use sensornet_packet::{DeviceId, OpCode};
//!
//! let encoder = AtEncoder::new(DeviceId::new(2));
//! let frame = encoder.encode_packet(OpCode::MeasureResponse, b"0080").unwrap();
//!
//! let mut parser = AtParser::new();
//! let mut received = None;
//! for byte in frame {
//!     if let ParseEvent::ValidPacket(packet) = parser.feed(byte) {
//!         received = Some(packet.clone());
//!     }
//! }
//! assert_eq!(received.unwrap().data(), b"0080");
//! ```

pub mod api_mode;
pub mod at_mode;
mod codec;
mod error;
mod event;

pub use codec::*;
pub use error::*;
pub use event::*;

/// Checksum over a run of bytes: `0xFF` minus the byte sum, modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    0xFFu8.wrapping_sub(bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)))
}
