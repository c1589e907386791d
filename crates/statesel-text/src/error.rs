//! Error types for the text pipeline.

use std::path::Path;

use thiserror::Error;

/// Error type for text pipeline operations.
#[derive(Debug, Error)]
pub enum TextError {
    /// Filesystem read or write failed.
    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    /// A pretrained vector line could not be parsed.
    #[error("malformed vector at line {line}: {message}")]
    MalformedVector { line: usize, message: String },

    /// A saved embedding matrix could not be parsed.
    #[error("malformed embeddings file '{path}': {message}")]
    MalformedEmbeddings { path: String, message: String },

    /// A dataset row could not be parsed.
    #[error("malformed TSV '{path}' at line {line}: {message}")]
    MalformedTsv {
        path: String,
        line: usize,
        message: String,
    },

    /// Token inserted twice into a vocabulary.
    #[error("duplicate token '{token}'")]
    DuplicateToken { token: String },

    /// Vocabulary lacks a reserved token required for encoding.
    #[error("vocabulary is missing special token '{token}'")]
    MissingSpecial { token: String },

    /// Vocabulary and embedding matrix disagree.
    #[error("embedding matrix has {rows} rows but vocabulary has {tokens} tokens")]
    SizeMismatch { rows: usize, tokens: usize },

    /// Batch size of zero.
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    /// Embedding width of zero.
    #[error("embedding dimension must be at least 1")]
    InvalidDimension,

    /// Neither cached vocabulary/embeddings nor pretrained vectors available.
    #[error("no pretrained vectors given and no cached vocabulary and embeddings found")]
    MissingVectors,
}

/// Result type for text pipeline operations.
pub type TextResult<T> = Result<T, TextError>;

impl TextError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        TextError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
