//! Error types for dialcheck.

use thiserror::Error;

use crate::batch::{BatchError, InputError, ReportError};
use crate::config::ConfigError;

/// Core error type for dialcheck operations.
#[derive(Error, Debug)]
pub enum DialcheckError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Planning or lifecycle errors
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Input parsing errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Report export errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Normalization left nothing to check.
    #[error("No valid identifiers in input")]
    NoValidIdentifiers,

    /// Another run already holds the resolver session.
    #[error("Resolver session '{0}' is busy with another run")]
    SessionBusy(String),
}

/// Result type alias for dialcheck operations.
pub type Result<T> = std::result::Result<T, DialcheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialcheck_error_config_conversion() {
        let config_err = ConfigError::InvalidValue("batch_size must be at least 1".to_string());
        let err: DialcheckError = config_err.into();
        match err {
            DialcheckError::Config(ConfigError::InvalidValue(msg)) => {
                assert!(msg.contains("batch_size"));
            }
            _ => panic!("Expected Config error variant"),
        }
    }

    #[test]
    fn test_dialcheck_error_batch_conversion() {
        let err: DialcheckError = BatchError::InvalidConfig("batch size must be at least 1".into()).into();
        assert!(matches!(err, DialcheckError::Batch(_)));
        assert!(err.to_string().starts_with("Batch error:"));
    }

    #[test]
    fn test_dialcheck_error_report_conversion() {
        let err: DialcheckError = ReportError::Generation("writer closed".to_string()).into();
        assert!(matches!(err, DialcheckError::Report(_)));
        assert!(err.to_string().contains("writer closed"));
    }

    #[test]
    fn test_dialcheck_error_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: DialcheckError = io_err.into();
        match err {
            DialcheckError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_dialcheck_error_messages() {
        assert_eq!(DialcheckError::NoValidIdentifiers.to_string(), "No valid identifiers in input");
        let msg = DialcheckError::SessionBusy("primary".to_string()).to_string();
        assert!(msg.contains("primary"));
        assert!(msg.contains("busy"));
    }
}
