//! Settings: the non-role arguments a context was created with.

use std::collections::BTreeMap;

use crate::value::Value;

/// Read-only passthrough of extra constructor arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    entries: BTreeMap<String, Value>,
}

impl Settings {
    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
    }

    /// A copy of every setting.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries.clone()
    }

    /// A single setting's value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    /// Only the requested settings; keys that were never set are left out.
    pub fn pick(&self, keys: &[&str]) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .filter(|(key, _)| keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
