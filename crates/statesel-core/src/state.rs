//! State trees of typed variables.
//!
//! A [`State`] stores the leaves of a hierarchical model state as a flat,
//! path-ordered map. Each leaf is a [`Variable`]: a JSON value together with
//! its logical type and an optional tag. Filters select leaves through the
//! [`Node`] capabilities that `Variable` exposes.
//!
//! ## JSON format
//!
//! ```json
//! {
//!   "dense": {
//!     "kernel": {"type": "Param", "value": [[0.1, 0.2]]},
//!     "bias": {"type": "Param", "value": [0.0]}
//!   },
//!   "bn": {"mean": {"type": "BatchStat", "tag": "stats", "value": [0.0]}},
//!   "layers": [{"w": {"type": "Param", "value": 1.0}}]
//! }
//! ```
//!
//! Objects with a string `"type"` field are variables; other objects are
//! subtrees keyed by name and arrays are subtrees keyed by index.

use std::collections::btree_map::{self, BTreeMap};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::Predicate;
use crate::node::{Node, RegistryError, TypeDesc, TypeRegistry, VARIABLE_STATE};
use crate::path::{display_path, PathKey};

/// Maximum number of unmatched paths listed in a split error message.
const MAX_LISTED_PATHS: usize = 5;

/// Error type for state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Input is not valid JSON.
    #[error("invalid state JSON: {0}")]
    ParseError(String),

    /// A leaf position holds something other than a variable.
    #[error("invalid leaf at '{path}': {message}")]
    InvalidLeaf { path: String, message: String },

    /// Variable type could not be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A match-everything filter appears before the last position.
    #[error("match-everything filter at position {position} must be the last filter")]
    WildcardNotLast { position: usize },

    /// Some leaves matched none of the split filters.
    #[error("non-exhaustive filters: {} leaves matched no filter: {}", paths.len(), summarize(paths))]
    NonExhaustive { paths: Vec<String> },

    /// Index `n` and name `"n"` at one level would share a JSON key.
    #[error("index {key} and name '{key}' both appear under '{path}'")]
    KeyCollision { path: String, key: String },

    /// A variable sits where other leaves continue the path.
    #[error("variable at '{path}' has leaves below it")]
    LeafWithChildren { path: String },
}

fn summarize(paths: &[String]) -> String {
    let mut listed = paths
        .iter()
        .take(MAX_LISTED_PATHS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if paths.len() > MAX_LISTED_PATHS {
        listed.push_str(", ...");
    }
    listed
}

// ============================================================================
// Variables
// ============================================================================

/// A state leaf: a value with a logical type and an optional tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    runtime: TypeDesc,
    kind: TypeDesc,
    tag: Option<String>,
    value: Value,
}

impl Variable {
    /// Create a variable of the given logical type.
    ///
    /// The runtime type is the registry's `VariableState`.
    pub fn new(registry: &TypeRegistry, kind: TypeDesc, value: Value) -> Self {
        let runtime = registry
            .get(VARIABLE_STATE)
            .cloned()
            .unwrap_or_else(|| TypeDesc::root(VARIABLE_STATE));
        Variable {
            runtime,
            kind,
            tag: None,
            value,
        }
    }

    /// Attach a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The logical type.
    pub fn kind(&self) -> &TypeDesc {
        &self.kind
    }

    /// The wrapped value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Decode a variable object, e.g. `{"type": "Param", "value": 1}`.
    fn from_json_map(
        map: &Map<String, Value>,
        registry: &TypeRegistry,
        path: &[PathKey],
    ) -> Result<Self, StateError> {
        let invalid = |message: String| StateError::InvalidLeaf {
            path: display_path(path),
            message,
        };

        let mut type_name = None;
        let mut tag = None;
        let mut value = Value::Null;
        for (key, field) in map {
            match (key.as_str(), field) {
                ("type", Value::String(name)) => type_name = Some(name.as_str()),
                ("tag", Value::String(t)) => tag = Some(t.clone()),
                ("tag", Value::Null) => {}
                ("value", v) => value = v.clone(),
                (other, v) => {
                    return Err(invalid(format!("unexpected field '{}': {}", other, v)));
                }
            }
        }

        let type_name = type_name.ok_or_else(|| invalid("missing 'type'".to_string()))?;
        let kind = registry.resolve(type_name)?;
        let mut variable = Variable::new(registry, kind, value);
        variable.tag = tag;
        Ok(variable)
    }

    /// Encode as a variable object.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(self.kind.name().to_string()));
        if let Some(tag) = &self.tag {
            map.insert("tag".to_string(), Value::String(tag.clone()));
        }
        map.insert("value".to_string(), self.value.clone());
        Value::Object(map)
    }
}

impl Node for Variable {
    fn runtime_type(&self) -> Option<&TypeDesc> {
        Some(&self.runtime)
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    fn logical_type(&self) -> Option<&TypeDesc> {
        Some(&self.kind)
    }
}

fn is_variable(map: &Map<String, Value>) -> bool {
    matches!(map.get("type"), Some(Value::String(_)))
}

// ============================================================================
// State
// ============================================================================

/// Flat, path-ordered collection of variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    leaves: BTreeMap<Vec<PathKey>, Variable>,
}

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        State::default()
    }

    /// Decode a nested JSON state.
    pub fn from_json(value: &Value, registry: &TypeRegistry) -> Result<Self, StateError> {
        let mut state = State::new();
        let mut path = Vec::new();
        collect_leaves(value, &mut path, registry, &mut state.leaves)?;
        tracing::debug!(leaves = state.len(), "decoded state");
        Ok(state)
    }

    /// Parse and decode a nested JSON state string.
    pub fn from_json_str(input: &str, registry: &TypeRegistry) -> Result<Self, StateError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| StateError::ParseError(e.to_string()))?;
        State::from_json(&value, registry)
    }

    /// Encode as nested JSON.
    ///
    /// Levels whose keys are exactly the indices `0..n` become arrays; all
    /// other levels become objects (indices rendered as strings).
    ///
    /// Fails when two leaves would land on the same JSON location, which
    /// can happen after merging states of different shapes.
    pub fn to_json(&self) -> Result<Value, StateError> {
        let entries: Vec<(&[PathKey], &Variable)> = self
            .leaves
            .iter()
            .map(|(path, var)| (path.as_slice(), var))
            .collect();
        nest(&mut Vec::new(), &entries)
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns true if the state has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Look up a leaf by path.
    pub fn get(&self, path: &[PathKey]) -> Option<&Variable> {
        self.leaves.get(path)
    }

    /// Insert or replace a leaf, returning the previous one.
    pub fn insert(&mut self, path: Vec<PathKey>, variable: Variable) -> Option<Variable> {
        self.leaves.insert(path, variable)
    }

    /// Iterate leaves in path order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.leaves.iter(),
        }
    }

    /// Paths of all leaves, rendered as `a/b/c`.
    pub fn paths(&self) -> Vec<String> {
        self.leaves.keys().map(|p| display_path(p)).collect()
    }

    /// Keep the leaves matched by at least one predicate.
    pub fn filter(&self, predicates: &[Predicate]) -> State {
        let leaves: BTreeMap<_, _> = self
            .leaves
            .iter()
            .filter(|(path, var)| predicates.iter().any(|p| p.matches(path, *var)))
            .map(|(path, var)| (path.clone(), var.clone()))
            .collect();
        tracing::debug!(kept = leaves.len(), total = self.len(), "filtered state");
        State { leaves }
    }

    /// Partition leaves by the first predicate each one matches.
    ///
    /// Returns one state per predicate, in order. Every leaf must be matched
    /// by some predicate, and a match-everything predicate may only appear
    /// last.
    pub fn split(&self, predicates: &[Predicate]) -> Result<Vec<State>, StateError> {
        if let Some(position) = predicates
            .iter()
            .position(|p| *p == Predicate::Everything)
        {
            if position + 1 != predicates.len() {
                return Err(StateError::WildcardNotLast { position });
            }
        }

        let mut parts = vec![State::new(); predicates.len()];
        let mut unmatched = Vec::new();
        for (path, var) in &self.leaves {
            match predicates.iter().position(|p| p.matches(path, var)) {
                Some(i) => {
                    parts[i].leaves.insert(path.clone(), var.clone());
                }
                None => unmatched.push(display_path(path)),
            }
        }

        if !unmatched.is_empty() {
            return Err(StateError::NonExhaustive { paths: unmatched });
        }

        tracing::debug!(
            partitions = parts.len(),
            sizes = ?parts.iter().map(State::len).collect::<Vec<_>>(),
            "split state"
        );
        Ok(parts)
    }

    /// Union of several states; later states win on path conflicts.
    pub fn merge<I>(states: I) -> State
    where
        I: IntoIterator<Item = State>,
    {
        let mut merged = State::new();
        for state in states {
            merged.leaves.extend(state.leaves);
        }
        merged
    }
}

impl FromIterator<(Vec<PathKey>, Variable)> for State {
    fn from_iter<T: IntoIterator<Item = (Vec<PathKey>, Variable)>>(iter: T) -> Self {
        State {
            leaves: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a State {
    type Item = (&'a [PathKey], &'a Variable);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over `(path, variable)` pairs in path order.
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, Vec<PathKey>, Variable>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [PathKey], &'a Variable);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(path, var)| (path.as_slice(), var))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn collect_leaves(
    value: &Value,
    path: &mut Vec<PathKey>,
    registry: &TypeRegistry,
    leaves: &mut BTreeMap<Vec<PathKey>, Variable>,
) -> Result<(), StateError> {
    match value {
        Value::Object(map) if is_variable(map) => {
            let variable = Variable::from_json_map(map, registry, path)?;
            leaves.insert(path.clone(), variable);
        }
        Value::Object(map) => {
            for (key, child) in map {
                path.push(PathKey::Name(key.clone()));
                collect_leaves(child, path, registry, leaves)?;
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathKey::Index(index));
                collect_leaves(child, path, registry, leaves)?;
                path.pop();
            }
        }
        other => {
            return Err(StateError::InvalidLeaf {
                path: display_path(path),
                message: format!("expected a variable object, found {}", other),
            });
        }
    }
    Ok(())
}

fn nest(prefix: &mut Vec<PathKey>, entries: &[(&[PathKey], &Variable)]) -> Result<Value, StateError> {
    if let [(path, var)] = entries {
        if path.is_empty() {
            return Ok(var.to_json());
        }
    }

    let mut groups: BTreeMap<&PathKey, Vec<(&[PathKey], &Variable)>> = BTreeMap::new();
    for (path, var) in entries {
        let Some((first, rest)) = path.split_first() else {
            return Err(StateError::LeafWithChildren {
                path: display_path(prefix),
            });
        };
        groups.entry(first).or_default().push((rest, *var));
    }

    let is_sequence = !groups.is_empty()
        && groups
            .keys()
            .enumerate()
            .all(|(i, key)| key.as_index() == Some(i));

    let mut children = Vec::with_capacity(groups.len());
    for (key, group) in &groups {
        prefix.push((*key).clone());
        let child = nest(prefix, group);
        prefix.pop();
        children.push((*key, child?));
    }

    if is_sequence {
        return Ok(Value::Array(children.into_iter().map(|(_, child)| child).collect()));
    }

    let mut map = Map::new();
    for (key, child) in children {
        let name = key.to_string();
        if map.contains_key(&name) {
            return Err(StateError::KeyCollision {
                path: display_path(prefix),
                key: name,
            });
        }
        map.insert(name, child);
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{parse_filter_expr, to_predicate};
    use crate::path::path_of;
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::with_builtins()
    }

    fn sample_json() -> Value {
        json!({
            "dense": {
                "kernel": {"type": "Param", "value": [[0.1, 0.2]]},
                "bias": {"type": "Param", "value": [0.0]}
            },
            "bn": {
                "mean": {"type": "BatchStat", "tag": "stats", "value": [0.0]},
                "var": {"type": "BatchStat", "tag": "stats", "value": [1.0]}
            },
            "rng": {"key": {"type": "RngKey", "value": 42}},
            "layers": [
                {"w": {"type": "Param", "value": 1.0}},
                {"w": {"type": "Param", "tag": "lora", "value": 2.0}}
            ]
        })
    }

    fn sample() -> State {
        State::from_json(&sample_json(), &registry()).unwrap()
    }

    fn layer_path(index: usize, leaf: &str) -> Vec<PathKey> {
        vec![PathKey::from("layers"), PathKey::from(index), PathKey::from(leaf)]
    }

    // =========================================================================
    // Decode / Encode Tests
    // =========================================================================

    #[test]
    fn test_from_json_flattens_leaves() {
        let state = sample();
        assert_eq!(state.len(), 7);

        let kernel = state.get(&path_of(["dense", "kernel"])).unwrap();
        assert_eq!(kernel.kind().name(), "Param");
        assert_eq!(kernel.value(), &json!([[0.1, 0.2]]));
        assert_eq!(kernel.runtime_type().unwrap().name(), VARIABLE_STATE);

        let lora = state.get(&layer_path(1, "w")).unwrap();
        assert_eq!(Node::tag(lora), Some("lora"));
    }

    #[test]
    fn test_paths_are_ordered() {
        let state = sample();
        assert_eq!(
            state.paths(),
            vec![
                "bn/mean",
                "bn/var",
                "dense/bias",
                "dense/kernel",
                "layers/0/w",
                "layers/1/w",
                "rng/key",
            ]
        );
    }

    #[test]
    fn test_to_json_round_trips() {
        let reg = registry();
        let state = sample();
        let encoded = state.to_json().unwrap();
        assert_eq!(encoded, sample_json());
        assert_eq!(State::from_json(&encoded, &reg).unwrap(), state);
    }

    #[test]
    fn test_scalar_leaf_is_invalid() {
        let err = State::from_json(&json!({"dense": {"kernel": 1.0}}), &registry()).unwrap_err();
        match err {
            StateError::InvalidLeaf { path, .. } => assert_eq!(path, "dense/kernel"),
            other => panic!("expected InvalidLeaf, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_variable_field() {
        let err = State::from_json(
            &json!({"w": {"type": "Param", "value": 1, "shape": [1]}}),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, StateError::InvalidLeaf { .. }));
    }

    #[test]
    fn test_unknown_variable_type() {
        let err = State::from_json(&json!({"w": {"type": "Mystery"}}), &registry()).unwrap_err();
        assert!(matches!(
            err,
            StateError::Registry(RegistryError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_from_json_str_syntax_error() {
        let err = State::from_json_str("{", &registry()).unwrap_err();
        assert!(matches!(err, StateError::ParseError(_)));
    }

    // =========================================================================
    // Filter Tests
    // =========================================================================

    #[test]
    fn test_filter_by_type() {
        let reg = registry();
        let state = sample();
        let params = state.filter(&[to_predicate(reg.resolve("Param").unwrap())]);
        assert_eq!(params.len(), 4);
        assert!(params.iter().all(|(_, var)| var.kind().name() == "Param"));
    }

    #[test]
    fn test_filter_by_supertype_and_tag() {
        let reg = registry();
        let state = sample();

        let rng = state.filter(&[to_predicate(reg.resolve("RngState").unwrap())]);
        assert_eq!(rng.paths(), vec!["rng/key"]);

        let stats = state.filter(&[to_predicate("stats")]);
        assert_eq!(stats.paths(), vec!["bn/mean", "bn/var"]);
    }

    #[test]
    fn test_filter_with_multiple_predicates_is_union() {
        let state = sample();
        let picked = state.filter(&[
            Predicate::path_contains("bias"),
            Predicate::path_contains(1),
        ]);
        assert_eq!(picked.paths(), vec!["dense/bias", "layers/1/w"]);
    }

    #[test]
    fn test_filter_with_expression() {
        let reg = registry();
        let state = sample();
        let pred = parse_filter_expr("type:Param and not path:layers", &reg).unwrap();
        assert_eq!(state.filter(&[pred]).paths(), vec!["dense/bias", "dense/kernel"]);
    }

    // =========================================================================
    // Split / Merge Tests
    // =========================================================================

    #[test]
    fn test_split_first_match_wins() {
        let reg = registry();
        let state = sample();
        let parts = state
            .split(&[
                to_predicate("lora"),
                to_predicate(reg.resolve("Param").unwrap()),
                Predicate::everything(),
            ])
            .unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].paths(), vec!["layers/1/w"]);
        assert_eq!(parts[1].len(), 3);
        assert_eq!(parts[2].paths(), vec!["bn/mean", "bn/var", "rng/key"]);
    }

    #[test]
    fn test_split_non_exhaustive() {
        let reg = registry();
        let err = sample()
            .split(&[to_predicate(reg.resolve("Param").unwrap())])
            .unwrap_err();
        match err {
            StateError::NonExhaustive { paths } => {
                assert_eq!(paths, vec!["bn/mean", "bn/var", "rng/key"]);
            }
            other => panic!("expected NonExhaustive, got {:?}", other),
        }
    }

    #[test]
    fn test_split_wildcard_must_be_last() {
        let err = sample()
            .split(&[Predicate::everything(), to_predicate("stats")])
            .unwrap_err();
        assert!(matches!(err, StateError::WildcardNotLast { position: 0 }));
    }

    #[test]
    fn test_merge_inverts_split() {
        let reg = registry();
        let state = sample();
        let parts = state
            .split(&[
                to_predicate(reg.resolve("BatchStat").unwrap()),
                Predicate::everything(),
            ])
            .unwrap();
        assert_eq!(State::merge(parts), state);
    }

    #[test]
    fn test_merge_later_wins() {
        let reg = registry();
        let param = reg.resolve("Param").unwrap();
        let path = path_of(["w"]);

        let first: State = [(path.clone(), Variable::new(&reg, param.clone(), json!(1)))]
            .into_iter()
            .collect();
        let second: State = [(path.clone(), Variable::new(&reg, param, json!(2)))]
            .into_iter()
            .collect();

        let merged = State::merge([first, second]);
        assert_eq!(merged.get(&path).unwrap().value(), &json!(2));
    }

    #[test]
    fn test_mixed_keys_encode_as_object() {
        let reg = registry();
        let param = reg.resolve("Param").unwrap();
        let mut state = State::new();
        state.insert(
            vec![PathKey::from(0)],
            Variable::new(&reg, param.clone(), json!(1)),
        );
        state.insert(
            vec![PathKey::from("name")],
            Variable::new(&reg, param, json!(2)).with_tag("t"),
        );
        assert_eq!(
            state.to_json().unwrap(),
            json!({
                "0": {"type": "Param", "value": 1},
                "name": {"type": "Param", "tag": "t", "value": 2}
            })
        );
    }

    #[test]
    fn test_merged_index_and_name_collide() {
        let reg = registry();
        let as_list = State::from_json(
            &json!({"layers": [{"type": "Param", "value": 1}]}),
            &reg,
        )
        .unwrap();
        let as_map = State::from_json(
            &json!({"layers": {"0": {"type": "Param", "value": 2}}}),
            &reg,
        )
        .unwrap();

        let merged = State::merge([as_list, as_map]);
        assert_eq!(merged.len(), 2);
        match merged.to_json().unwrap_err() {
            StateError::KeyCollision { path, key } => {
                assert_eq!(path, "layers");
                assert_eq!(key, "0");
            }
            other => panic!("expected KeyCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_variable_with_leaves_below_is_rejected() {
        let reg = registry();
        let param = reg.resolve("Param").unwrap();
        let mut state = State::new();
        state.insert(path_of(["dense"]), Variable::new(&reg, param.clone(), json!(1)));
        state.insert(path_of(["dense", "bias"]), Variable::new(&reg, param, json!(2)));

        match state.to_json().unwrap_err() {
            StateError::LeafWithChildren { path } => assert_eq!(path, "dense"),
            other => panic!("expected LeafWithChildren, got {:?}", other),
        }
    }

    #[test]
    fn test_error_message_lists_paths() {
        let err = StateError::NonExhaustive {
            paths: (0..7).map(|i| format!("p{}", i)).collect(),
        };
        assert_eq!(
            err.to_string(),
            "non-exhaustive filters: 7 leaves matched no filter: p0, p1, p2, p3, p4, ..."
        );
    }
}
