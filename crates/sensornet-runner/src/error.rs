//! Error types for the runner.

use sensornet_coordinator::CoordinatorError;
use sensornet_link::LinkError;
use sensornet_transport::TransportError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running a node.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// File that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`RunnerConfig`](crate::RunnerConfig).
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Rejected command-line or config value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading the console or writing a reply failed.
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Sending on the packet link failed.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The coordinator rejected its config or a request.
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    /// Logging could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
