//! ConfigTree: the JSON object persisted per layer and exposed after merge.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROFILES: &str = "profiles";
pub const DEFAULTS: &str = "defaults";
pub const ALL: &str = "all";
pub const PLUGINS: &str = "plugins";
pub const SECURE: &str = "secure";
pub const SCHEMA: &str = "$schema";

/// A configuration tree.
///
/// The structural keys (`profiles`, `defaults`, `all`, `plugins`, `secure`)
/// are guaranteed present with the right container type once the tree has
/// been through [`ConfigTree::normalize`]. Any other top-level key is kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Map<String, Value>);

impl Default for ConfigTree {
    fn default() -> Self {
        Self::from_map(Map::new())
    }
}

impl ConfigTree {
    /// Build a normalized tree from a raw JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut tree = Self(map);
        tree.normalize();
        tree
    }

    /// Build a normalized tree from any JSON value; non-objects become empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Self::default(),
        }
    }

    /// Fill in missing or mistyped structural keys with empty containers.
    pub fn normalize(&mut self) {
        for key in [PROFILES, DEFAULTS, ALL] {
            if !matches!(self.0.get(key), Some(Value::Object(_))) {
                self.0.insert(key.to_string(), Value::Object(Map::new()));
            }
        }
        for key in [PLUGINS, SECURE] {
            if !matches!(self.0.get(key), Some(Value::Array(_))) {
                self.0.insert(key.to_string(), Value::Array(Vec::new()));
            }
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn profiles(&self) -> &Map<String, Value> {
        self.object(PROFILES)
    }

    pub fn profiles_mut(&mut self) -> &mut Map<String, Value> {
        self.object_mut(PROFILES)
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        self.object(DEFAULTS)
    }

    pub fn defaults_mut(&mut self) -> &mut Map<String, Value> {
        self.object_mut(DEFAULTS)
    }

    pub fn all(&self) -> &Map<String, Value> {
        self.object(ALL)
    }

    pub fn all_mut(&mut self) -> &mut Map<String, Value> {
        self.object_mut(ALL)
    }

    /// Plugin names; non-string entries are skipped.
    pub fn plugins(&self) -> Vec<String> {
        self.strings(PLUGINS)
    }

    /// Dotted secure paths; non-string entries are skipped.
    pub fn secure(&self) -> Vec<String> {
        self.strings(SECURE)
    }

    pub fn set_plugins(&mut self, plugins: Vec<String>) {
        self.0.insert(
            PLUGINS.to_string(),
            Value::Array(plugins.into_iter().map(Value::String).collect()),
        );
    }

    pub fn set_secure(&mut self, secure: Vec<String>) {
        self.0.insert(
            SECURE.to_string(),
            Value::Array(secure.into_iter().map(Value::String).collect()),
        );
    }

    /// Add a dotted path to `secure` unless it is already listed.
    /// Returns whether the list changed.
    pub fn add_secure(&mut self, path: &str) -> bool {
        let mut secure = self.secure();
        if secure.iter().any(|p| p == path) {
            return false;
        }
        secure.push(path.to_string());
        self.set_secure(secure);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
        self.normalize();
    }

    fn object(&self, key: &str) -> &Map<String, Value> {
        static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
        match self.0.get(key) {
            Some(Value::Object(map)) => map,
            _ => EMPTY.get_or_init(Map::new),
        }
    }

    fn object_mut(&mut self, key: &str) -> &mut Map<String, Value> {
        let slot = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot was just made an object"),
        }
    }

    fn strings(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}
