//! Path keys for locating nodes in hierarchical state.
//!
//! A path is an ordered sequence of [`PathKey`]s, from the root of a state
//! tree down to a leaf. Paths are produced by traversal and never mutated by
//! predicates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One element of a state path.
///
/// Names and indices are distinct: `Name("0")` never equals `Index(0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    /// Positional key (list element).
    Index(usize),
    /// Named key (mapping entry).
    Name(String),
}

impl PathKey {
    /// Returns the name if this is a named key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PathKey::Name(name) => Some(name),
            PathKey::Index(_) => None,
        }
    }

    /// Returns the index if this is a positional key.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathKey::Index(index) => Some(*index),
            PathKey::Name(_) => None,
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(index) => write!(f, "{}", index),
            PathKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for PathKey {
    fn from(name: &str) -> Self {
        PathKey::Name(name.to_string())
    }
}

impl From<String> for PathKey {
    fn from(name: String) -> Self {
        PathKey::Name(name)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

/// Render a path as `a/b/0/c`.
pub fn display_path(path: &[PathKey]) -> String {
    path.iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build a path from keys.
///
/// ```
/// use statesel_core::path::{path_of, PathKey};
///
/// let path = path_of(["layers", "0", "kernel"]);
/// assert_eq!(path.len(), 3);
/// assert_eq!(path[1], PathKey::from("0"));
/// ```
pub fn path_of<I, K>(keys: I) -> Vec<PathKey>
where
    I: IntoIterator<Item = K>,
    K: Into<PathKey>,
{
    keys.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_index_are_distinct() {
        assert_ne!(PathKey::from("0"), PathKey::from(0));
        assert_eq!(PathKey::from(0).as_index(), Some(0));
        assert_eq!(PathKey::from("dense").as_name(), Some("dense"));
        assert_eq!(PathKey::from("dense").as_index(), None);
    }

    #[test]
    fn test_display_path() {
        let mut path = path_of(["params", "layers"]);
        path.push(PathKey::from(2));
        path.push(PathKey::from("kernel"));
        assert_eq!(display_path(&path), "params/layers/2/kernel");
        assert_eq!(display_path(&[]), "");
    }

    #[test]
    fn test_indices_sort_before_names() {
        let mut keys = vec![PathKey::from("a"), PathKey::from(1), PathKey::from(0)];
        keys.sort();
        assert_eq!(
            keys,
            vec![PathKey::from(0), PathKey::from(1), PathKey::from("a")]
        );
    }
}
