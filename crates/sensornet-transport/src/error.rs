//! Transport error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur on a byte transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The serial device could not be opened.
    #[error("could not open serial device {}: {source}", path.display())]
    Open {
        /// Device path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the device failed.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `init()` has not been called.
    #[error("transport not initialised")]
    NotInitialized,

    /// `init()` was called twice.
    #[error("transport already initialised")]
    AlreadyInitialized,

    /// The transport has been shut down and no buffered bytes remain.
    #[error("transport closed")]
    Closed,

    /// The receive thread panicked.
    #[error("receive thread panicked")]
    ThreadPanicked,
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Returned by queue operations once the queue has been closed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("queue closed")]
pub struct QueueClosed;

impl From<QueueClosed> for TransportError {
    fn from(_: QueueClosed) -> Self {
        TransportError::Closed
    }
}
