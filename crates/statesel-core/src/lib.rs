//! Core infrastructure for statesel.
//!
//! This crate provides the filter algebra used to select subsets of
//! hierarchical model state:
//! - Path keys identifying a location in a state tree
//! - Type descriptors, the type registry and the `Node` capability trait
//! - Predicates, combinators and filter literal normalization
//! - JSON and expression front ends for filter literals
//! - A state tree of typed variables (filter, split, merge)
//!
//! ## Usage
//!
//! ```
//! use statesel_core::filter::{to_predicate, Predicate};
//! use statesel_core::node::TypeRegistry;
//! use statesel_core::path::PathKey;
//! use statesel_core::state::Variable;
//!
//! let registry = TypeRegistry::with_builtins();
//! let param = registry.resolve("Param").unwrap();
//!
//! let pred = Predicate::all([to_predicate(&param), Predicate::path_contains("dense")]);
//! let kernel = Variable::new(&registry, param.clone(), serde_json::json!([1.0, 2.0]));
//! let path = [PathKey::from("dense"), PathKey::from("kernel")];
//! assert!(pred.matches(&path, &kernel));
//! ```

pub mod filter;
pub mod node;
pub mod path;
pub mod state;
