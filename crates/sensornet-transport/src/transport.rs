//! The byte transport contract.

use std::thread;
use std::time::Duration;

use crate::Result;

/// Silence required around the command mode sequence.
pub const GUARD_TIME: Duration = Duration::from_secs(1);

/// A blocking byte source and sink connected to a radio.
///
/// Methods take `&self` so one transport can be shared between the consumer
/// task (calling [`get_byte`](Self::get_byte)) and senders.
pub trait ByteTransport: Send + Sync {
    /// Open the device and start receiving. Fails if the device cannot be opened.
    fn init(&self) -> Result<()>;

    /// Block until a received byte is available.
    ///
    /// Returns [`TransportError::Closed`](crate::TransportError::Closed) once
    /// the transport has been shut down and its buffer drained. There is no
    /// timeout.
    fn get_byte(&self) -> Result<u8>;

    /// Write bytes to the device.
    fn send_bytes(&self, bytes: &[u8]) -> Result<()>;

    /// Stop receiving, wake the consumer and release the device.
    fn shutdown(&self) -> Result<()>;

    /// Block for at least [`GUARD_TIME`].
    fn guard_delay(&self) {
        thread::sleep(GUARD_TIME);
    }
}
