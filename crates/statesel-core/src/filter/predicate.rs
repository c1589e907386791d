//! Predicate types and evaluation.
//!
//! A [`Predicate`] is a pure test over a `(path, node)` pair. Predicates are
//! immutable values: they compare and hash structurally, render to a
//! canonical string, and can be shared freely across threads.
//!
//! ## Atomic predicates
//!
//! - `WithTag(tag)` - node's tag equals `tag`
//! - `OfType(type)` - node's own type or logical type is a subtype of `type`
//! - `PathContains(key)` - `key` is an element of the path
//! - `Everything()` / `Nothing()` - constant true / false
//!
//! ## Combinators
//!
//! - `Any(..)` - at least one sub-predicate matches (empty: never)
//! - `All(..)` - every sub-predicate matches (empty: always)
//! - `Not(..)` - negation
//!
//! Combinator constructors accept raw filter literals and normalize them with
//! [`to_predicate`](super::to_predicate).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::literal::{to_predicate, Filter};
use crate::node::{Node, TypeDesc};
use crate::path::PathKey;

/// Signature of user-supplied predicate closures.
pub type PredicateFn = dyn Fn(&[PathKey], &dyn Node) -> bool + Send + Sync;

/// A composable boolean test over `(path, node)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Node's tag equals the given tag.
    WithTag(String),
    /// Node's own type or logical type is a subtype of the given type.
    OfType(TypeDesc),
    /// Key appears anywhere in the path.
    PathContains(PathKey),
    /// Always true.
    Everything,
    /// Always false.
    Nothing,
    /// Logical OR over sub-predicates.
    Any(Arc<[Predicate]>),
    /// Logical AND over sub-predicates.
    All(Arc<[Predicate]>),
    /// Logical negation.
    Not(Arc<Predicate>),
    /// Opaque user closure, compared by identity.
    Custom(CustomPredicate),
}

impl Predicate {
    /// Tag equality predicate.
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Predicate::WithTag(tag.into())
    }

    /// Type membership predicate.
    pub fn of_type(ty: &TypeDesc) -> Self {
        Predicate::OfType(ty.clone())
    }

    /// Path membership predicate.
    pub fn path_contains(key: impl Into<PathKey>) -> Self {
        Predicate::PathContains(key.into())
    }

    /// Constant true predicate.
    pub fn everything() -> Self {
        Predicate::Everything
    }

    /// Constant false predicate.
    pub fn nothing() -> Self {
        Predicate::Nothing
    }

    /// Disjunction over filter literals, normalized at construction.
    pub fn any<I, F>(filters: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Filter>,
    {
        Predicate::Any(filters.into_iter().map(to_predicate).collect())
    }

    /// Conjunction over filter literals, normalized at construction.
    pub fn all<I, F>(filters: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Filter>,
    {
        Predicate::All(filters.into_iter().map(to_predicate).collect())
    }

    /// Negation of a filter literal.
    ///
    /// Double negation is kept as written: `not(not(f))` matches exactly
    /// what `f` matches but is not structurally equal to it.
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: impl Into<Filter>) -> Self {
        Predicate::Not(Arc::new(to_predicate(filter)))
    }

    /// Wrap a closure as a predicate.
    ///
    /// The closure must be deterministic and free of side effects.
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[PathKey], &dyn Node) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom(CustomPredicate::new(name, func))
    }

    /// Evaluate this predicate against a `(path, node)` pair.
    pub fn matches(&self, path: &[PathKey], node: &dyn Node) -> bool {
        match self {
            Predicate::WithTag(tag) => node.tag() == Some(tag.as_str()),
            Predicate::OfType(ty) => {
                node.runtime_type().is_some_and(|t| t.is_subtype_of(ty))
                    || node.logical_type().is_some_and(|t| t.is_subtype_of(ty))
            }
            Predicate::PathContains(key) => path.contains(key),
            Predicate::Everything => true,
            Predicate::Nothing => false,
            Predicate::Any(preds) => preds.iter().any(|p| p.matches(path, node)),
            Predicate::All(preds) => preds.iter().all(|p| p.matches(path, node)),
            Predicate::Not(pred) => !pred.matches(path, node),
            Predicate::Custom(custom) => custom.call(path, node),
        }
    }

    /// Sub-predicates of a combinator, in construction order.
    ///
    /// Atomic predicates have no children.
    pub fn children(&self) -> &[Predicate] {
        match self {
            Predicate::Any(preds) | Predicate::All(preds) => &preds[..],
            Predicate::Not(pred) => std::slice::from_ref(&**pred),
            _ => &[],
        }
    }

    /// Returns true for `Any`, `All` and `Not`.
    pub fn is_combinator(&self) -> bool {
        matches!(
            self,
            Predicate::Any(_) | Predicate::All(_) | Predicate::Not(_)
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::WithTag(tag) => write!(f, "WithTag({})", quote(tag)),
            Predicate::OfType(ty) => write!(f, "OfType({})", ty),
            Predicate::PathContains(PathKey::Name(name)) => {
                write!(f, "PathContains({})", quote(name))
            }
            Predicate::PathContains(PathKey::Index(index)) => write!(f, "PathContains({})", index),
            Predicate::Everything => f.write_str("Everything()"),
            Predicate::Nothing => f.write_str("Nothing()"),
            Predicate::Any(preds) => write_combinator(f, "Any", preds),
            Predicate::All(preds) => write_combinator(f, "All", preds),
            Predicate::Not(pred) => write!(f, "Not({})", pred),
            Predicate::Custom(custom) => write!(f, "Custom({})", custom.name()),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn write_combinator(f: &mut fmt::Formatter<'_>, name: &str, preds: &[Predicate]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, pred) in preds.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", pred)?;
    }
    f.write_str(")")
}

/// Single-quote a string, escaping backslashes and quotes.
fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

// ============================================================================
// Custom Predicates
// ============================================================================

/// A named closure predicate.
///
/// Equality and hashing use the identity of the shared closure, so clones of
/// one custom predicate are equal while two separately built closures never
/// are, even with the same name.
#[derive(Clone)]
pub struct CustomPredicate {
    name: Arc<str>,
    func: Arc<PredicateFn>,
}

impl CustomPredicate {
    /// Wrap a closure.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[PathKey], &dyn Node) -> bool + Send + Sync + 'static,
    {
        CustomPredicate {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, path: &[PathKey], node: &dyn Node) -> bool {
        (self.func)(path, node)
    }

    fn identity(&self) -> *const () {
        Arc::as_ptr(&self.func) as *const ()
    }
}

impl PartialEq for CustomPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for CustomPredicate {}

impl Hash for CustomPredicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
