//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::{Result, RunnerError};

/// Filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Build the log filter. An explicit level wins over `RUST_LOG`.
pub fn log_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| RunnerError::Logging(format!("bad log level '{}': {}", directive, e))),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))),
    }
}

/// Install the global subscriber, writing to stderr so console replies on
/// stdout stay clean. `log` records from the byte-path crates are forwarded.
pub fn init_tracing(level: Option<&str>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level)?)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| RunnerError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level() {
        assert!(log_filter(Some("debug")).is_ok());
        assert!(log_filter(Some("sensornet_link=trace,info")).is_ok());
    }

    #[test]
    fn test_bad_level() {
        assert!(matches!(
            log_filter(Some("=not a level=")),
            Err(RunnerError::Logging(_))
        ));
    }
}
