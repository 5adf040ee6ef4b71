//! Error types for svgif

use std::time::Duration;
use thiserror::Error;

/// Main error type for svgif operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid sampling plan: {0}")]
    InvalidPlan(String),

    #[error("Capture {index} failed: {reason}")]
    Capture { index: usize, reason: String },

    #[error("Quantization failed: {0}")]
    Quantization(String),

    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias using svgif's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPlan,
    CaptureFailure,
    QuantizationFailure,
    AssemblyFailure,
    Cancelled,
    Other,
}

impl Error {
    /// Create a capture error for the capture at `index`
    pub fn capture(index: usize, reason: impl Into<String>) -> Self {
        Error::Capture {
            index,
            reason: reason.into(),
        }
    }

    /// Create a capture error for a capture that exceeded its grace period
    pub fn capture_timeout(index: usize, grace: Duration) -> Self {
        Error::capture(index, format!("timed out after {} ms", grace.as_millis()))
    }

    /// Which pipeline stage this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPlan(_) => ErrorKind::InvalidPlan,
            Error::Capture { .. } => ErrorKind::CaptureFailure,
            Error::Quantization(_) => ErrorKind::QuantizationFailure,
            Error::Assembly(_) => ErrorKind::AssemblyFailure,
            Error::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::InvalidPlan("x".into()).kind(),
            ErrorKind::InvalidPlan
        );
        assert_eq!(Error::capture(3, "gone").kind(), ErrorKind::CaptureFailure);
        assert_eq!(
            Error::Assembly("empty".into()).kind(),
            ErrorKind::AssemblyFailure
        );
        assert_eq!(Error::Config("bad".into()).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_capture_timeout_message() {
        let err = Error::capture_timeout(2, Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Capture 2 failed: timed out after 1500 ms");
    }
}
