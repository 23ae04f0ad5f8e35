//! Link error types.

use sensornet_codec::EncodeError;
use sensornet_transport::TransportError;
use thiserror::Error;

/// Errors that can occur on a packet link.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The packet or command could not be framed.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The receive thread could not be started.
    #[error("failed to spawn receiver: {0}")]
    Spawn(#[source] std::io::Error),

    /// The receive thread panicked.
    #[error("receiver thread panicked")]
    ReceiverPanicked,
}

/// Result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;
