use super::array::Array;
use super::node::{Entries, Node, Value};
use super::primitive::{Name, PdfDate};
use super::stream::Stream;
use super::type_key::TypeKey;
use crate::error::Result;
use tracing::warn;

/// Dictionary view over a shared node. Also usable over the dictionary
/// part of a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary(Node);

impl Dictionary {
    pub fn new() -> Self {
        Self(Node::new(Value::Dictionary(Entries::new())))
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Node::new(Value::Dictionary(Entries::with_capacity(capacity))))
    }

    pub(crate) fn from_node(node: Node) -> Self {
        Self(node)
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.with_entries(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0
            .with_entries(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn keys(&self) -> Vec<Name> {
        self.0
            .with_entries(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the stored entries, in insertion order.
    pub fn entries(&self) -> Vec<(Name, Node)> {
        self.0
            .with_entries(|entries| {
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stored entry, without dereferencing.
    pub fn get_raw(&self, key: &str) -> Option<Node> {
        self.0
            .with_entries(|entries| entries.get(key).cloned())
            .flatten()
    }

    pub fn try_get(&self, key: &str) -> Result<Option<Node>> {
        match self.get_raw(key) {
            Some(node) => node.resolve(),
            None => Ok(None),
        }
    }

    /// Entry for `key`, dereferenced. Resolution failures are logged and
    /// reported as missing.
    pub fn get(&self, key: &str) -> Option<Node> {
        self.try_get(key).unwrap_or_else(|err| {
            warn!("Failed to resolve /{}: {}", key, err);
            None
        })
    }

    pub fn get_typed(&self, key: &str, type_key: TypeKey) -> Option<Node> {
        self.get(key).and_then(|node| type_key.select(node))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|node| node.as_bool())
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|node| node.as_integer())
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|node| node.as_real())
    }

    pub fn get_name(&self, key: &str) -> Option<Name> {
        self.get(key).and_then(|node| node.as_name())
    }

    pub fn get_date(&self, key: &str) -> Option<PdfDate> {
        self.get_typed(key, TypeKey::Date)
            .and_then(|node| node.as_date())
    }

    pub fn get_dictionary(&self, key: &str) -> Option<Dictionary> {
        self.get(key).and_then(|node| node.as_dictionary())
    }

    pub fn get_array(&self, key: &str) -> Option<Array> {
        self.get(key).and_then(|node| node.as_array())
    }

    pub fn get_stream(&self, key: &str) -> Option<Stream> {
        self.get(key).and_then(|node| node.as_stream())
    }

    /// Returns `true` if `key` holds a Name equal to `name`.
    pub fn is_name(&self, key: &str, name: &str) -> bool {
        self.get_name(key).is_some_and(|n| n == name)
    }

    /// Stores `value` under `key` and returns the node actually stored
    /// (a copy if `value` was already owned elsewhere).
    pub fn set(&self, key: impl Into<Name>, value: impl Into<Node>) -> Node {
        let key = key.into();
        let value = value.into();
        if self
            .get_raw(key.as_str())
            .is_some_and(|current| Node::ptr_eq(&current, &value))
        {
            self.0.update();
            return value;
        }

        let child = self.0.include(value);
        let previous = self
            .0
            .with_entries_mut(|entries| entries.insert(key, child.clone()))
            .flatten();
        if let Some(previous) = previous {
            self.0.exclude(&previous);
        }
        self.0.update();
        child
    }

    pub fn remove(&self, key: &str) -> Option<Node> {
        let removed = self
            .0
            .with_entries_mut(|entries| entries.shift_remove(key))
            .flatten()?;
        self.0.exclude(&removed);
        self.0.update();
        Some(removed)
    }

    pub fn clear(&self) {
        let removed = self
            .0
            .with_entries_mut(std::mem::take)
            .unwrap_or_default();
        for node in removed.values() {
            self.0.exclude(node);
        }
        self.0.update();
    }

    /// Key under which `value` is stored, by identity first and
    /// structurally otherwise. Linear scan.
    pub fn key_of(&self, value: &Node) -> Option<Name> {
        self.0
            .with_entries(|entries| {
                entries
                    .iter()
                    .find(|(_, v)| Node::ptr_eq(v, value))
                    .or_else(|| entries.iter().find(|(_, v)| *v == value))
                    .map(|(key, _)| key.clone())
            })
            .flatten()
    }

    /// Entry for `key` if it has the requested shape; otherwise a Virtual
    /// placeholder of that shape is stored (replacing a mismatching entry)
    /// and returned. Never fails.
    pub fn get_or_create(&self, key: impl Into<Name>, type_key: TypeKey) -> Node {
        let key = key.into();
        if let Some(existing) = self.get_typed(key.as_str(), type_key) {
            return existing;
        }

        let placeholder = self.0.include(Node::placeholder(type_key));
        let replaced = self
            .0
            .with_entries_mut(|entries| entries.insert(key, placeholder.clone()))
            .flatten();
        if let Some(replaced) = replaced {
            self.0.exclude(&replaced);
            self.0.update();
        }
        placeholder
    }

    pub fn get_or_create_dictionary(&self, key: impl Into<Name>) -> Dictionary {
        Dictionary::from_node(self.get_or_create(key, TypeKey::Dictionary))
    }

    pub fn get_or_create_array(&self, key: impl Into<Name>) -> Array {
        Array::from_node(self.get_or_create(key, TypeKey::Array))
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<Name>, V: Into<Node>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let entries: Entries = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self(Node::new(Value::Dictionary(entries)))
    }
}
