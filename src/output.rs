//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Structured JSON:** every CLI response, success or failure, is JSON
//! 2. **Status first:** every response has `status` as its first field
//! 3. **Deterministic:** same input, same output (field and leaf order)
//! 4. **Versioned:** `schema_version` enables forward compatibility

use std::io::{self, Write};

use serde::Serialize;
use statesel_text::encode::EncodedExample;

use crate::config::ResolvedConfig;
use crate::error::{OutputErrorCode, SelError};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code (also the exit code).
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a SelError.
    pub fn from_error(err: &SelError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            SelError::InvalidArguments { details, .. } => details.clone(),
            SelError::NonExhaustive { paths } => Some(serde_json::json!({ "paths": paths })),
            SelError::UnknownType { name } => Some(serde_json::json!({ "name": name })),
            SelError::FileError { path, .. } => Some(serde_json::json!({ "path": path })),
            SelError::DataError {
                path: Some(path), ..
            } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a SelError.
    pub fn from_error(err: &SelError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// Response for the explain command.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainResponse {
    pub status: String,
    pub schema_version: String,
    /// Canonical predicate form.
    pub predicate: String,
    /// Number of direct sub-predicates (0 for atoms).
    pub children: usize,
}

impl ExplainResponse {
    pub fn new(predicate: String, children: usize) -> Self {
        ExplainResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            predicate,
            children,
        }
    }
}

/// Response for the select command.
#[derive(Debug, Clone, Serialize)]
pub struct SelectResponse {
    pub status: String,
    pub schema_version: String,
    /// Canonical forms of the filters, in order.
    pub filters: Vec<String>,
    /// Number of selected leaves.
    pub count: usize,
    /// Selected leaves as nested state JSON.
    pub state: serde_json::Value,
}

impl SelectResponse {
    pub fn new(filters: Vec<String>, count: usize, state: serde_json::Value) -> Self {
        SelectResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            filters,
            count,
            state,
        }
    }
}

/// One partition of a split.
#[derive(Debug, Clone, Serialize)]
pub struct Partition {
    /// Canonical form of the filter that claimed these leaves.
    pub filter: String,
    pub count: usize,
    pub state: serde_json::Value,
}

/// Response for the split command.
#[derive(Debug, Clone, Serialize)]
pub struct SplitResponse {
    pub status: String,
    pub schema_version: String,
    pub partitions: Vec<Partition>,
}

impl SplitResponse {
    pub fn new(partitions: Vec<Partition>) -> Self {
        SplitResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            partitions,
        }
    }
}

/// Example counts per split, or batch counts per split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: usize,
    pub valid: usize,
    pub test: usize,
}

/// Response for the prepare command.
#[derive(Debug, Clone, Serialize)]
pub struct PrepareResponse {
    pub status: String,
    pub schema_version: String,
    pub vocab_size: usize,
    pub embedding_dim: usize,
    pub examples: SplitCounts,
    /// Batches in the first training epoch and in the evaluation splits.
    pub batches: SplitCounts,
    /// First encoded training example.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<EncodedExample>,
    /// Effective configuration with value sources.
    pub config: ResolvedConfig,
}

// ============================================================================
// Emit
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
