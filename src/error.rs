//! Error types for the dashboard.
//!
//! Collector failures, configuration problems and terminal I/O all funnel
//! through [`MonitorError`]. Most of them are absorbed at the component that
//! raised them (a collector keeps its last values, the console degrades a
//! capability); only configuration and terminal setup errors reach `main`.

use std::io;
use thiserror::Error;

/// Error type for dashboard operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A metric collector is not available on this system.
    #[error("collector '{0}' is not available on this system")]
    CollectorUnavailable(&'static str),

    /// Failed to collect metrics from a collector.
    #[error("failed to collect metrics from '{collector}': {message}")]
    CollectionFailed {
        /// The collector that failed.
        collector: &'static str,
        /// Error message describing the failure.
        message: String,
    },

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// Terminal initialization or rendering error.
    #[error("terminal error: {0}")]
    TerminalError(#[from] io::Error),

    /// Process vanished between listing and sampling.
    #[error("process {0} not found")]
    ProcessNotFound(u32),

    /// The log subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    LoggingInit(String),
}

impl MonitorError {
    /// Shorthand for a [`MonitorError::CollectionFailed`].
    pub fn collection(collector: &'static str, message: impl Into<String>) -> Self {
        Self::CollectionFailed {
            collector,
            message: message.into(),
        }
    }
}

/// Result type alias for dashboard operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_error_includes_line_number() {
        let err = MonitorError::ConfigParse {
            line: 42,
            message: "unknown backend `curses`".to_string(),
        };
        let display = err.to_string();

        assert!(display.contains("line 42"), "missing line number: {display}");
        assert!(display.contains("unknown backend"), "missing message: {display}");
    }

    #[test]
    fn test_collection_failed_includes_details() {
        let err = MonitorError::collection("cpu", "/proc/stat not readable");
        let display = err.to_string();

        assert!(display.contains("cpu"));
        assert!(display.contains("/proc/stat"));
    }

    #[test]
    fn test_config_invalid_includes_key() {
        let err = MonitorError::ConfigInvalid {
            key: "global.refresh_ms".to_string(),
            message: "must be at least 100".to_string(),
        };
        assert!(err.to_string().contains("global.refresh_ms"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no tty");
        let err: MonitorError = io_err.into();

        assert!(matches!(err, MonitorError::TerminalError(_)));
        assert!(err.to_string().contains("no tty"));
    }

    #[test]
    fn test_process_not_found() {
        let err = MonitorError::ProcessNotFound(12345);
        assert!(err.to_string().contains("12345"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MonitorError>();
    }
}
