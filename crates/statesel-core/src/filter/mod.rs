//! Filter predicate algebra for selecting subsets of state.
//!
//! This module implements filtering over `(path, node)` pairs. It supports:
//! - Atomic predicates (tag, type, path membership, constants)
//! - Boolean combinators (`Any`, `All`, `Not`) over nested filters
//! - Normalization of filter literals into predicates
//! - JSON and expression front ends for filter literals
//!
//! ## Usage
//!
//! ```
//! use statesel_core::filter::{to_predicate, Filter, Predicate};
//! use statesel_core::path::path_of;
//!
//! // Collections are disjunctions
//! let pred = to_predicate(vec![Filter::from("batch_stats"), Filter::from("cache")]);
//! assert_eq!(pred, Predicate::any(["batch_stats", "cache"]));
//!
//! // Path membership is an exact element match
//! let bias = Predicate::path_contains("bias");
//! assert!(bias.matches(&path_of(["dense", "bias"]), &serde_json::Value::Null));
//! ```

mod expr;
mod json;
mod literal;
mod predicate;

// Re-export public API from predicate module
pub use predicate::{CustomPredicate, Predicate, PredicateFn};

// Re-export public API from literal module
pub use literal::{to_predicate, Filter, FilterError};

// Re-export public API from json module
pub use json::{filter_from_json, parse_filter_json, JsonFilterError, WILDCARD};

// Re-export public API from expression module
pub use expr::{parse_filter_expr, parse_filter_expr_tree, Atom, ExprError, FilterExpr};
