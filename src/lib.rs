//! statesel: select and partition hierarchical model state with filters.
//!
//! Filters are predicates over `(path, node)` pairs. This crate ties the
//! filter algebra and state tree from `statesel-core` and the text input
//! pipeline from `statesel-text` to a JSON-speaking command line.

// Core infrastructure - re-exported from statesel-core
pub use statesel_core::filter;
pub use statesel_core::node;
pub use statesel_core::path;
pub use statesel_core::state;

// Text input pipeline
pub use statesel_text as text;

pub mod cli;
pub mod config;
pub mod error;
pub mod output;

// Error bridges - converts subsystem errors to SelError
mod error_bridges;
