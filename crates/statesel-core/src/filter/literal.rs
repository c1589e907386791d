//! Filter literals and normalization.
//!
//! A [`Filter`] is the user-facing shorthand for a selection criterion. Every
//! literal normalizes to exactly one [`Predicate`] via [`to_predicate`]:
//!
//! | Literal | Predicate |
//! |---------|-----------|
//! | `Tag("a")` | `WithTag('a')` |
//! | `Type(T)` | `OfType(T)` |
//! | `Bool(true)` / `Wildcard` | `Everything()` |
//! | `Bool(false)` / `Null` | `Nothing()` |
//! | `Predicate(p)` | `p` unchanged |
//! | `Collection([f, ..])` | `Any(f, ..)` |
//!
//! The literal union is closed, so normalization itself cannot fail. Literals
//! decoded from dynamic input (see [`super::json`]) are validated on the way
//! in and report [`FilterError::InvalidFilter`] for shapes that have no
//! counterpart here.

use thiserror::Error;

use super::predicate::Predicate;
use crate::node::{RegistryError, TypeDesc};

/// Error type for filter literal decoding.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Literal does not match any recognized filter shape.
    #[error("invalid filter: {value}")]
    InvalidFilter { value: String },

    /// Type name could not be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A filter literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Type descriptor: selects values of this type.
    Type(TypeDesc),
    /// Tag string: selects values with this tag.
    Tag(String),
    /// Constant: `true` selects everything, `false` nothing.
    Bool(bool),
    /// Matches anything.
    Wildcard,
    /// Matches nothing.
    Null,
    /// An already-normalized predicate.
    Predicate(Predicate),
    /// Disjunction of the contained literals.
    Collection(Vec<Filter>),
}

/// Normalize a filter literal into a predicate.
///
/// ```
/// use statesel_core::filter::{to_predicate, Filter, Predicate};
///
/// assert_eq!(to_predicate(true), Predicate::everything());
/// assert_eq!(to_predicate(Filter::Null), Predicate::nothing());
/// assert_eq!(
///     to_predicate(vec!["a", "b"]),
///     Predicate::any([Predicate::with_tag("a"), Predicate::with_tag("b")])
/// );
/// ```
pub fn to_predicate(filter: impl Into<Filter>) -> Predicate {
    match filter.into() {
        Filter::Tag(tag) => Predicate::WithTag(tag),
        Filter::Type(ty) => Predicate::OfType(ty),
        Filter::Bool(true) | Filter::Wildcard => Predicate::Everything,
        Filter::Bool(false) | Filter::Null => Predicate::Nothing,
        Filter::Predicate(pred) => pred,
        Filter::Collection(filters) => Predicate::any(filters),
    }
}

impl From<&str> for Filter {
    fn from(tag: &str) -> Self {
        Filter::Tag(tag.to_string())
    }
}

impl From<String> for Filter {
    fn from(tag: String) -> Self {
        Filter::Tag(tag)
    }
}

impl From<TypeDesc> for Filter {
    fn from(ty: TypeDesc) -> Self {
        Filter::Type(ty)
    }
}

impl From<&TypeDesc> for Filter {
    fn from(ty: &TypeDesc) -> Self {
        Filter::Type(ty.clone())
    }
}

impl From<bool> for Filter {
    fn from(value: bool) -> Self {
        Filter::Bool(value)
    }
}

impl From<Predicate> for Filter {
    fn from(pred: Predicate) -> Self {
        Filter::Predicate(pred)
    }
}

impl From<&Predicate> for Filter {
    fn from(pred: &Predicate) -> Self {
        Filter::Predicate(pred.clone())
    }
}

impl<F: Into<Filter>> From<Option<F>> for Filter {
    fn from(value: Option<F>) -> Self {
        value.map_or(Filter::Null, Into::into)
    }
}

impl<F: Into<Filter>> From<Vec<F>> for Filter {
    fn from(filters: Vec<F>) -> Self {
        Filter::Collection(filters.into_iter().map(Into::into).collect())
    }
}

impl<F: Into<Filter>, const N: usize> From<[F; N]> for Filter {
    fn from(filters: [F; N]) -> Self {
        Filter::Collection(filters.into_iter().map(Into::into).collect())
    }
}
