//! Packet error types.

use thiserror::Error;

/// Errors that can occur when building a packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Payload does not fit in a packet.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Length that was supplied.
        actual: usize,
    },
}

/// Result type for packet operations.
pub type PacketResult<T> = Result<T, PacketError>;
