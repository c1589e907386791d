//! Error types and error code constants for statesel.
//!
//! This module provides a unified error type (`SelError`) that bridges
//! domain-specific errors from the filter, state, text and config layers
//! into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (malformed filters, bad flags, non-exhaustive splits)
//! - `3`: Resolution errors (unknown types, unreadable files)
//! - `4`: Data errors (malformed state, vocabulary, vectors or datasets)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad filter, bad flag value).
    InvalidArguments = 2,
    /// Resolution errors (unknown type, file not readable).
    ResolutionError = 3,
    /// Input data could not be decoded.
    DataError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
///
/// All subsystem errors are converted to this type before being rendered as
/// JSON. Each variant carries enough context for a helpful message and an
/// optional `details` object.
#[derive(Debug, Error)]
pub enum SelError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// A filter could not be parsed or is not a valid literal.
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// Split filters left some leaves unassigned.
    #[error("non-exhaustive filters: {} leaves matched no filter", paths.len())]
    NonExhaustive { paths: Vec<String> },

    /// Type name not present in the registry.
    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    /// A file could not be read or written.
    #[error("cannot access '{path}': {message}")]
    FileError { path: String, message: String },

    /// Input data is malformed.
    #[error("data error: {message}")]
    DataError {
        message: String,
        path: Option<String>,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&SelError> for OutputErrorCode {
    fn from(err: &SelError) -> Self {
        match err {
            SelError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            SelError::InvalidFilter { .. } => OutputErrorCode::InvalidArguments,
            SelError::NonExhaustive { .. } => OutputErrorCode::InvalidArguments,
            SelError::UnknownType { .. } => OutputErrorCode::ResolutionError,
            SelError::FileError { .. } => OutputErrorCode::ResolutionError,
            SelError::DataError { .. } => OutputErrorCode::DataError,
            SelError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<SelError> for OutputErrorCode {
    fn from(err: SelError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl SelError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        SelError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid arguments error with JSON details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        SelError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a data error attributed to a file.
    pub fn data(message: impl Into<String>, path: Option<String>) -> Self {
        SelError::DataError {
            message: message.into(),
            path,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        SelError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_filter_maps_to_invalid_arguments() {
            let err = SelError::InvalidFilter {
                message: "3".to_string(),
            };
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn non_exhaustive_maps_to_invalid_arguments() {
            let err = SelError::NonExhaustive {
                paths: vec!["a/b".to_string()],
            };
            assert_eq!(OutputErrorCode::from(&err), OutputErrorCode::InvalidArguments);
        }

        #[test]
        fn unknown_type_maps_to_resolution_error() {
            let err = SelError::UnknownType {
                name: "Mystery".to_string(),
            };
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn data_error_maps_to_data_error() {
            let err = SelError::data("bad leaf", Some("state.json".to_string()));
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn internal_error_maps_to_internal_error() {
            let err = SelError::internal("unexpected state");
            assert_eq!(OutputErrorCode::from(err), OutputErrorCode::InternalError);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn non_exhaustive_display() {
            let err = SelError::NonExhaustive {
                paths: vec!["a".to_string(), "b".to_string()],
            };
            assert_eq!(
                err.to_string(),
                "non-exhaustive filters: 2 leaves matched no filter"
            );
        }

        #[test]
        fn file_error_display() {
            let err = SelError::FileError {
                path: "state.json".to_string(),
                message: "not found".to_string(),
            };
            assert_eq!(err.to_string(), "cannot access 'state.json': not found");
        }
    }

    mod output_error_code {
        use super::*;

        #[test]
        fn code_values_are_stable() {
            assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
            assert_eq!(OutputErrorCode::ResolutionError.code(), 3);
            assert_eq!(OutputErrorCode::DataError.code(), 4);
            assert_eq!(OutputErrorCode::InternalError.code(), 10);
        }

        #[test]
        fn display_shows_code() {
            assert_eq!(format!("{}", OutputErrorCode::DataError), "4");
        }
    }
}
