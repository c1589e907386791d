//! Type descriptors and node capabilities.
//!
//! Predicates never inspect values directly. Instead, every value in a state
//! tree implements [`Node`], which exposes up to three optional capabilities:
//!
//! - `runtime_type` - the value's own type (instance-of checks)
//! - `tag` - a string tag attached to the value
//! - `logical_type` - a type carried by wrappers (e.g. a variable state whose
//!   own type is `VariableState` but which stands for a `Param`)
//!
//! Types are described by [`TypeDesc`], a named descriptor with single
//! inheritance. A [`TypeRegistry`] maps names to descriptors so that textual
//! and JSON filters can refer to types by name.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

/// Name of the runtime type shared by all state leaves.
pub const VARIABLE_STATE: &str = "VariableState";

/// Built-in type hierarchy as `(name, parent)` pairs, parents first.
const BUILTIN_TYPES: &[(&str, Option<&str>)] = &[
    ("Variable", None),
    ("Param", Some("Variable")),
    ("BatchStat", Some("Variable")),
    ("Cache", Some("Variable")),
    ("Intermediate", Some("Variable")),
    ("Perturbation", Some("Intermediate")),
    ("RngState", Some("Variable")),
    ("RngKey", Some("RngState")),
    ("RngCount", Some("RngState")),
    (VARIABLE_STATE, None),
];

/// Error type for type registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Type name not present in the registry.
    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    /// Type name registered twice with different parents.
    #[error("type '{name}' is already registered with parent {existing}")]
    DuplicateType { name: String, existing: String },

    /// Failed to read a registry file.
    #[error("failed to read type registry '{path}': {message}")]
    Io { path: String, message: String },

    /// Registry file is not valid JSON.
    #[error("invalid type registry '{path}': {message}")]
    Parse { path: String, message: String },
}

// ============================================================================
// Type Descriptors
// ============================================================================

/// A named type descriptor with an optional parent.
///
/// Descriptors are cheap to clone and compare structurally: two descriptors
/// are equal when their names and parent chains are equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeDesc(Arc<TypeInner>);

#[derive(PartialEq, Eq, Hash)]
struct TypeInner {
    name: String,
    parent: Option<TypeDesc>,
}

impl TypeDesc {
    /// Create a root type with no parent.
    pub fn root(name: impl Into<String>) -> Self {
        TypeDesc(Arc::new(TypeInner {
            name: name.into(),
            parent: None,
        }))
    }

    /// Create a subtype of `self`.
    pub fn subtype(&self, name: impl Into<String>) -> Self {
        TypeDesc(Arc::new(TypeInner {
            name: name.into(),
            parent: Some(self.clone()),
        }))
    }

    /// The type's name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The direct parent, if any.
    pub fn parent(&self) -> Option<&TypeDesc> {
        self.0.parent.as_ref()
    }

    /// Returns true if `self` is `other` or inherits from it.
    pub fn is_subtype_of(&self, other: &TypeDesc) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == other {
                return true;
            }
            current = ty.parent();
        }
        false
    }

    /// Iterate from this type up to its root.
    pub fn ancestry(&self) -> impl Iterator<Item = &TypeDesc> {
        std::iter::successors(Some(self), |ty| ty.parent())
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain: Vec<&str> = self.ancestry().map(|ty| ty.name()).collect();
        write!(f, "TypeDesc({})", chain.join(" < "))
    }
}

// ============================================================================
// Node Capabilities
// ============================================================================

/// Capability surface of a value inside a state tree.
///
/// All capabilities are optional. A missing capability is never an error;
/// predicates treat it as a non-match.
pub trait Node {
    /// The value's own type.
    fn runtime_type(&self) -> Option<&TypeDesc> {
        None
    }

    /// The value's tag.
    fn tag(&self) -> Option<&str> {
        None
    }

    /// The logical type carried by a wrapper value.
    fn logical_type(&self) -> Option<&TypeDesc> {
        None
    }
}

/// Raw JSON values carry no capabilities.
impl Node for serde_json::Value {}

// ============================================================================
// Type Registry
// ============================================================================

/// One entry of a registry file.
#[derive(Debug, Clone, Deserialize)]
struct RegistryEntry {
    name: String,
    #[serde(default)]
    parent: Option<String>,
}

/// On-disk registry format: `{"types": [{"name": ..., "parent": ...}]}`.
#[derive(Debug, Clone, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    types: Vec<RegistryEntry>,
}

/// Name to descriptor lookup used by the JSON and expression front ends.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDesc>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Create a registry pre-populated with the built-in variable types.
    pub fn with_builtins() -> Self {
        let mut registry = TypeRegistry::new();
        for (name, parent) in BUILTIN_TYPES {
            // Built-ins are ordered parents first and have unique names.
            if let Err(err) = registry.register(name, *parent) {
                tracing::error!("built-in type registration failed: {}", err);
            }
        }
        registry
    }

    /// Register a type under an optional parent.
    ///
    /// Registering the same name with the same parent again returns the
    /// existing descriptor.
    pub fn register(&mut self, name: &str, parent: Option<&str>) -> Result<TypeDesc, RegistryError> {
        let parent = parent.map(|p| self.resolve(p)).transpose()?;

        if let Some(existing) = self.types.get(name) {
            if existing.parent() == parent.as_ref() {
                return Ok(existing.clone());
            }
            return Err(RegistryError::DuplicateType {
                name: name.to_string(),
                existing: existing
                    .parent()
                    .map(|p| p.name().to_string())
                    .unwrap_or_else(|| "<none>".to_string()),
            });
        }

        let ty = match parent {
            Some(parent) => parent.subtype(name),
            None => TypeDesc::root(name),
        };
        self.types.insert(name.to_string(), ty.clone());
        tracing::debug!(name, "registered type");
        Ok(ty)
    }

    /// Look up a type by name.
    pub fn get(&self, name: &str) -> Option<&TypeDesc> {
        self.types.get(name)
    }

    /// Look up a type by name, failing with `UnknownType`.
    pub fn resolve(&self, name: &str) -> Result<TypeDesc, RegistryError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Register every type listed in a JSON registry document.
    ///
    /// Entries are applied in order, so parents must appear before children.
    pub fn extend_from_json(&mut self, input: &str) -> Result<(), RegistryError> {
        self.extend_from_json_named(input, "<inline>")
    }

    /// Register every type listed in a registry file.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<(), RegistryError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: display.clone(),
            message: e.to_string(),
        })?;
        self.extend_from_json_named(&content, &display)
    }

    fn extend_from_json_named(&mut self, input: &str, source: &str) -> Result<(), RegistryError> {
        let file: RegistryFile = serde_json::from_str(input).map_err(|e| RegistryError::Parse {
            path: source.to_string(),
            message: e.to_string(),
        })?;
        for entry in &file.types {
            self.register(&entry.name, entry.parent.as_deref())?;
        }
        tracing::debug!(source, count = file.types.len(), "loaded type registry entries");
        Ok(())
    }
}
