//! Coordinator error types.

use sensornet_link::LinkError;
use thiserror::Error;

/// Errors that can occur in the application layer.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// A request packet could not be sent.
    #[error("failed to send request: {0}")]
    Link(#[from] LinkError),

    /// The data report could not be serialized.
    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),

    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
