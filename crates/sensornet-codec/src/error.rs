//! Codec error types.

use thiserror::Error;

/// Why a frame was rejected by a parser.
///
/// Rejections are reported as [`ParseEvent::InvalidPacket`](crate::ParseEvent::InvalidPacket)
/// events, never as `Err` values: the parser keeps consuming the stream.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Trailing checksum byte did not match the frame contents.
    #[error("checksum mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u8,
        /// Checksum byte found on the wire.
        received: u8,
    },

    /// API frame type other than receive-packet.
    #[error("unsupported API frame type: 0x{0:02X}")]
    UnsupportedFrameType(u8),

    /// AT-mode length field larger than a packet can carry.
    #[error("declared payload length {declared} exceeds maximum")]
    PayloadTooLong {
        /// Declared payload length.
        declared: usize,
    },

    /// API-mode frame length outside what a receive-packet frame can have.
    #[error("declared frame length {declared} out of range")]
    FrameLengthOutOfRange {
        /// Declared frame length.
        declared: u16,
    },
}

impl FrameError {
    /// Short snake_case name of the rejection, for logs and metric labels.
    pub const fn reason(&self) -> &'static str {
        match self {
            FrameError::ChecksumMismatch { .. } => "checksum_mismatch",
            FrameError::UnsupportedFrameType(_) => "unsupported_frame_type",
            FrameError::PayloadTooLong { .. } => "payload_too_long",
            FrameError::FrameLengthOutOfRange { .. } => "frame_length_out_of_range",
        }
    }
}

/// Errors that can occur when encoding a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Payload does not fit in a packet.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// A byte that AT-mode framing cannot carry.
    #[error("byte 0x{byte:02X} at offset {offset} collides with the frame delimiter")]
    ReservedByte {
        /// The offending byte.
        byte: u8,
        /// Offset of the byte within the frame.
        offset: usize,
    },

    /// Radio command argument too long.
    #[error("command argument too long: maximum {max} bytes, got {actual}")]
    CommandTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length supplied.
        actual: usize,
    },
}

/// Result type for encoding operations.
pub type EncodeResult<T> = Result<T, EncodeError>;
