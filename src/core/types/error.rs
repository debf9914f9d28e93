//! Custom error types for Memory-Inspect

use std::fmt;
use thiserror::Error;

/// Main error type for memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to read memory at {address}: {reason}")]
    ReadFailed { address: String, reason: String },

    #[error("Failed to write memory at {address}: {reason}")]
    WriteFailed { address: String, reason: String },

    #[error("Invalid value type: {0}")]
    InvalidValueType(String),

    #[error("Invalid scan value: {0}")]
    InvalidValue(String),

    #[error("Invalid pattern format: {0}")]
    InvalidPattern(String),

    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("No previous scan results")]
    NoPreviousResults,

    #[error("Scan aborted: {0}")]
    ScanAborted(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid size {size} for {kind} field")]
    InvalidFieldSize { kind: String, size: usize },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Windows API: {0}")]
    WindowsApi(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates a read failed error
    pub fn read_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::ReadFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a write failed error
    pub fn write_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::WriteFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid field size error
    pub fn invalid_field_size(kind: impl fmt::Display, size: usize) -> Self {
        MemoryError::InvalidFieldSize {
            kind: kind.to_string(),
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors: Vec<(MemoryError, &str)> = vec![
            (
                MemoryError::InvalidAddress("0x123".to_string()),
                "Invalid memory address: 0x123",
            ),
            (
                MemoryError::read_failed("0x1000", "page fault"),
                "Failed to read memory at 0x1000: page fault",
            ),
            (
                MemoryError::write_failed("0x2000", "write protected"),
                "Failed to write memory at 0x2000: write protected",
            ),
            (
                MemoryError::InvalidValue("abc".to_string()),
                "Invalid scan value: abc",
            ),
            (MemoryError::ScanInProgress, "A scan is already in progress"),
            (MemoryError::NoPreviousResults, "No previous scan results"),
            (
                MemoryError::invalid_field_size("Float", 2),
                "Invalid size 2 for Float field",
            ),
            (
                MemoryError::InvalidPattern("?? XX".to_string()),
                "Invalid pattern format: ?? XX",
            ),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_helper_methods() {
        match MemoryError::read_failed("0xABCD", "invalid page") {
            MemoryError::ReadFailed { address, reason } => {
                assert_eq!(address, "0xABCD");
                assert_eq!(reason, "invalid page");
            }
            _ => panic!("Wrong error type"),
        }

        match MemoryError::invalid_field_size("Double", 4) {
            MemoryError::InvalidFieldSize { kind, size } => {
                assert_eq!(kind, "Double");
                assert_eq!(size, 4);
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_from_implementations() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let mem_err: MemoryError = io_err.into();
        assert!(matches!(mem_err, MemoryError::IoError(_)));

        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let mem_err: MemoryError = json_err.into();
        assert!(matches!(mem_err, MemoryError::JsonError(_)));
    }
}
