//! Source and character data documents
//!
//! Every wizard declares its own character-data shape, so both the read-only
//! rules content (`SourceData`) and the per-session output record
//! (`CharacterData`) are JSON documents rather than fixed structs. Typed
//! access goes through [`DataPath`], a dotted-path accessor.
//!
//! `SourceData` is fetched once per builder key and shared across sessions;
//! step logic never mutates it. `CharacterData` is deep-cloned at the start of
//! every recomputation pass, and the clone becomes the canonical value when
//! the pass commits.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// DataPath
// =============================================================================

/// Dotted path into a JSON document, e.g. `"abilities.str"`.
///
/// Segments that parse as integers index into arrays when the value at that
/// position is an array (`"companions.0.name"`); otherwise segments are object
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPath(Vec<String>);

impl DataPath {
    pub fn new(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for DataPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DataPath {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl std::fmt::Display for DataPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

fn lookup<'a>(root: &'a Value, path: &DataPath) -> Option<&'a Value> {
    let mut cur = root;
    for seg in path.segments() {
        cur = match cur {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

// =============================================================================
// SourceData
// =============================================================================

/// Read-only rules content for one wizard definition.
///
/// Shared across all sessions using the same builder key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceData(Value);

impl SourceData {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn root(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, path: &DataPath) -> Option<&Value> {
        lookup(&self.0, path)
    }

    /// String at a dotted path, if present.
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.get(&DataPath::new(path)).and_then(Value::as_str)
    }

    /// Integer at a dotted path, if present.
    pub fn i64_at(&self, path: &str) -> Option<i64> {
        self.get(&DataPath::new(path)).and_then(Value::as_i64)
    }

    /// Array at a dotted path, if present.
    pub fn array_at(&self, path: &str) -> Option<&Vec<Value>> {
        self.get(&DataPath::new(path)).and_then(Value::as_array)
    }
}

// =============================================================================
// CharacterData
// =============================================================================

/// Key under which a ForEach iteration's own slice is exposed to child steps.
pub const ITERATION_ITEM: &str = "item";
/// Key exposing the zero-based iteration index to child steps.
pub const ITERATION_INDEX: &str = "index";
/// Key exposing the parent document to child steps.
pub const ITERATION_PARENT: &str = "parent";

/// The per-session mutable record that steps write into.
///
/// Always a JSON object at the root; a non-object initial value is replaced
/// with an empty object so path writes always have somewhere to land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterData(Value);

impl CharacterData {
    pub fn new(value: Value) -> Self {
        match value {
            Value::Object(_) => Self(value),
            _ => Self::empty(),
        }
    }

    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// The synthetic document a ForEach iteration's child steps run against:
    /// `{ item, index, parent }`, built fresh each pass.
    pub fn for_iteration(item: Value, index: usize, parent: Value) -> Self {
        let mut map = Map::new();
        map.insert(ITERATION_ITEM.to_string(), item);
        map.insert(ITERATION_INDEX.to_string(), Value::from(index));
        map.insert(ITERATION_PARENT.to_string(), parent);
        Self(Value::Object(map))
    }

    /// Extract the iteration slice back out of a synthetic iteration document.
    pub fn into_iteration_item(self) -> Value {
        match self.0 {
            Value::Object(mut map) => map.remove(ITERATION_ITEM).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    pub fn root(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn get(&self, path: &DataPath) -> Option<&Value> {
        lookup(&self.0, path)
    }

    /// String at a dotted path, if present.
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.get(&DataPath::new(path)).and_then(Value::as_str)
    }

    /// Integer at a dotted path, if present.
    pub fn i64_at(&self, path: &str) -> Option<i64> {
        self.get(&DataPath::new(path)).and_then(Value::as_i64)
    }

    /// Array at a dotted path, if present.
    pub fn array_at(&self, path: &str) -> Option<&Vec<Value>> {
        self.get(&DataPath::new(path)).and_then(Value::as_array)
    }

    /// Write `value` at `path`, creating intermediate objects as needed.
    ///
    /// Existing arrays along the path are indexed when the segment parses as
    /// an in-range index; a write through an array with an invalid index is
    /// dropped. Any scalar encountered mid-path is replaced by an object.
    pub fn set(&mut self, path: &DataPath, value: Value) {
        let Some((last, parents)) = path.segments().split_last() else {
            // An empty path replaces the whole document; only objects are
            // valid roots.
            if value.is_object() {
                self.0 = value;
            }
            return;
        };

        let mut cur = &mut self.0;
        for seg in parents {
            cur = match cur {
                Value::Array(items) => {
                    match seg.parse::<usize>().ok().filter(|i| *i < items.len()) {
                        Some(i) => &mut items[i],
                        None => return,
                    }
                }
                other => {
                    if !other.is_object() {
                        *other = Value::Object(Map::new());
                    }
                    match other {
                        Value::Object(map) => map.entry(seg.clone()).or_insert(Value::Null),
                        _ => return,
                    }
                }
            };
        }

        match cur {
            Value::Array(items) => {
                if let Some(i) = last.parse::<usize>().ok().filter(|i| *i < items.len()) {
                    items[i] = value;
                }
            }
            other => {
                if !other.is_object() {
                    *other = Value::Object(Map::new());
                }
                if let Value::Object(map) = other {
                    map.insert(last.clone(), value);
                }
            }
        }
    }

    /// Remove the value at `path`, if present.
    pub fn remove(&mut self, path: &DataPath) {
        let Some((last, parents)) = path.segments().split_last() else {
            self.0 = Value::Object(Map::new());
            return;
        };
        let mut cur = &mut self.0;
        for seg in parents {
            cur = match cur {
                Value::Object(map) => match map.get_mut(seg) {
                    Some(v) => v,
                    None => return,
                },
                Value::Array(items) => {
                    match seg.parse::<usize>().ok().filter(|i| *i < items.len()) {
                        Some(i) => &mut items[i],
                        None => return,
                    }
                }
                _ => return,
            };
        }
        if let Value::Object(map) = cur {
            map.remove(last);
        }
    }
}

impl Default for CharacterData {
    fn default() -> Self {
        Self::empty()
    }
}
