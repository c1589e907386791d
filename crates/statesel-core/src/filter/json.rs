//! JSON filter literal decoding.
//!
//! This module decodes filter literals from JSON, the structured alternative
//! to the expression syntax that is easy to generate from tools and config
//! files. Decoding validates the whole literal up front, so a malformed
//! filter is rejected before any state is traversed.
//!
//! ## Schema
//!
//! ```json
//! "params"                        // tag
//! "..."                           // wildcard
//! true / false / null             // constants
//! ["params", {"type": "Param"}]   // collection (OR)
//! {"type": "BatchStat"}           // type, resolved via the registry
//! {"tag": "..."}                  // tag, even when it spells a keyword
//! {"path_contains": "dense"}      // path element (string or index)
//! {"any": [ <filter>, ... ]}
//! {"all": [ <filter>, ... ]}
//! {"not": <filter>}
//! ```
//!
//! Numbers, empty objects, objects with more than one key and unknown keys
//! are invalid.

use serde_json::Value;
use thiserror::Error;

use super::literal::{to_predicate, Filter, FilterError};
use super::predicate::Predicate;
use crate::node::TypeRegistry;
use crate::path::PathKey;

/// Wildcard spelling in JSON literals.
pub const WILDCARD: &str = "...";

/// Error type for JSON filter parsing.
#[derive(Debug, Error)]
pub enum JsonFilterError {
    /// Input is not valid JSON.
    #[error("invalid JSON: {0}")]
    ParseError(String),

    /// JSON is valid but is not a filter literal.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Decode a JSON value into a filter literal.
///
/// # Arguments
///
/// * `value` - JSON value holding the literal
/// * `registry` - Registry used to resolve `{"type": ...}` names
///
/// # Returns
///
/// * `Ok(Filter)` - The decoded literal
/// * `Err(FilterError::InvalidFilter)` - Unsupported shape (names the value)
/// * `Err(FilterError::Registry)` - Unknown type name
pub fn filter_from_json(value: &Value, registry: &TypeRegistry) -> Result<Filter, FilterError> {
    match value {
        Value::Null => Ok(Filter::Null),
        Value::Bool(b) => Ok(Filter::Bool(*b)),
        Value::String(s) if s == WILDCARD => Ok(Filter::Wildcard),
        Value::String(s) => Ok(Filter::Tag(s.clone())),
        Value::Array(items) => items
            .iter()
            .map(|item| filter_from_json(item, registry))
            .collect::<Result<Vec<_>, _>>()
            .map(Filter::Collection),
        Value::Object(map) => {
            let mut entries = map.iter();
            let (key, inner) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => return Err(invalid(value)),
            };
            decode_keyed(key, inner, value, registry)
        }
        Value::Number(_) => Err(invalid(value)),
    }
}

/// Decode a single-key object literal.
fn decode_keyed(
    key: &str,
    inner: &Value,
    whole: &Value,
    registry: &TypeRegistry,
) -> Result<Filter, FilterError> {
    match key {
        "type" => {
            let name = inner.as_str().ok_or_else(|| invalid(whole))?;
            Ok(Filter::Type(registry.resolve(name)?))
        }
        "tag" => {
            let tag = inner.as_str().ok_or_else(|| invalid(whole))?;
            Ok(Filter::Tag(tag.to_string()))
        }
        "path_contains" => {
            let key = path_key_from_json(inner).ok_or_else(|| invalid(whole))?;
            Ok(Filter::Predicate(Predicate::PathContains(key)))
        }
        "any" | "all" => {
            let items = inner.as_array().ok_or_else(|| invalid(whole))?;
            let filters = items
                .iter()
                .map(|item| filter_from_json(item, registry))
                .collect::<Result<Vec<_>, _>>()?;
            let pred = if key == "any" {
                Predicate::any(filters)
            } else {
                Predicate::all(filters)
            };
            Ok(Filter::Predicate(pred))
        }
        "not" => {
            let filter = filter_from_json(inner, registry)?;
            Ok(Filter::Predicate(Predicate::not(filter)))
        }
        _ => Err(invalid(whole)),
    }
}

fn path_key_from_json(value: &Value) -> Option<PathKey> {
    match value {
        Value::String(s) => Some(PathKey::Name(s.clone())),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(PathKey::Index),
        _ => None,
    }
}

fn invalid(value: &Value) -> FilterError {
    FilterError::InvalidFilter {
        value: value.to_string(),
    }
}

/// Parse a JSON filter string into a predicate.
///
/// # Examples
///
/// ```
/// use statesel_core::filter::{parse_filter_json, Predicate};
/// use statesel_core::node::TypeRegistry;
///
/// let registry = TypeRegistry::with_builtins();
///
/// let pred = parse_filter_json(r#"["params", {"not": {"path_contains": "bias"}}]"#, &registry).unwrap();
/// assert_eq!(pred.to_string(), "Any(WithTag('params'), Not(PathContains('bias')))");
///
/// assert!(parse_filter_json("3", &registry).is_err());
/// ```
pub fn parse_filter_json(input: &str, registry: &TypeRegistry) -> Result<Predicate, JsonFilterError> {
    let value: Value =
        serde_json::from_str(input).map_err(|e| JsonFilterError::ParseError(e.to_string()))?;
    let filter = filter_from_json(&value, registry)?;
    Ok(to_predicate(filter))
}
