//! Text input pipeline for statesel.
//!
//! This crate turns a GLUE SST-2 style data directory into padded batches of
//! token ids:
//! - Whitespace tokenization and token set extraction
//! - Vocabularies with reserved special tokens
//! - Pretrained GloVe vectors filtered to the dataset's tokens
//! - TSV dataset reading
//! - Encoding with sentence boundary markers
//! - Padded batching with reproducible per-epoch shuffling
//! - A data source tying the steps together

pub mod batch;
pub mod dataset;
pub mod embed;
pub mod encode;
pub mod error;
pub mod source;
pub mod tokenize;
pub mod vocab;

pub use error::{TextError, TextResult};
