//! Parse events and the parser/encoder traits.

use crate::{EncodeResult, FrameError};
use sensornet_packet::{DeviceId, OpCode, Packet};

/// Result of feeding one byte to a [`FrameParser`].
///
/// Borrowed data is only valid until the next byte is fed.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseEvent<'a> {
    /// No complete result yet.
    Parsing,
    /// A run of alphanumeric characters outside any frame (AT-mode only),
    /// such as the `OK` a radio prints in command mode.
    PlainWord(&'a [u8]),
    /// A frame delimiter was seen; any partial frame was discarded.
    StartPacket,
    /// A complete frame with a matching checksum.
    ValidPacket(&'a Packet),
    /// A frame was rejected.
    InvalidPacket(FrameError),
}

/// A byte-at-a-time frame parser.
///
/// One parser instance belongs to exactly one byte stream and must be fed
/// in order by a single owner.
pub trait FrameParser {
    /// Feed the next byte from the stream.
    fn feed(&mut self, byte: u8) -> ParseEvent<'_>;

    /// Discard any partial frame and return to the initial state.
    fn reset(&mut self);
}

/// Turns packets and radio commands into wire bytes.
pub trait FrameEncoder {
    /// Identity written into the `from` field of outgoing packets.
    fn device_id(&self) -> DeviceId;

    /// Encode a packet originating from this device.
    fn encode_packet(&self, op: OpCode, payload: &[u8]) -> EncodeResult<Vec<u8>>;

    /// Encode a two-letter radio command with an optional argument.
    fn encode_command(&self, command: [u8; 2], argument: Option<&[u8]>) -> EncodeResult<Vec<u8>>;
}
