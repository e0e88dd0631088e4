use super::node::{Node, Value};
use super::type_key::TypeKey;
use crate::error::{PdfError, Result};
use tracing::warn;

/// Array view over a shared node.
#[derive(Debug, Clone, PartialEq)]
pub struct Array(Node);

impl Array {
    pub fn new() -> Self {
        Self(Node::new(Value::Array(Vec::new())))
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Node::new(Value::Array(Vec::with_capacity(capacity))))
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
        self.0.with_items(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored entry at `index`, without dereferencing.
    pub fn get_raw(&self, index: usize) -> Option<Node> {
        self.0.with_items(|items| items.get(index).cloned()).flatten()
    }

    /// Entry at `index`, dereferenced. Resolution failures propagate.
    pub fn try_get(&self, index: usize) -> Result<Option<Node>> {
        match self.get_raw(index) {
            Some(node) => node.resolve(),
            None => Ok(None),
        }
    }

    /// Entry at `index`, dereferenced. Resolution failures are logged and
    /// reported as missing.
    pub fn get(&self, index: usize) -> Option<Node> {
        self.try_get(index).unwrap_or_else(|err| {
            warn!("Failed to resolve array element {}: {}", index, err);
            None
        })
    }

    pub fn get_typed(&self, index: usize, key: TypeKey) -> Option<Node> {
        self.get(index).and_then(|node| key.select(node))
    }

    /// Snapshot of the stored entries.
    pub fn items(&self) -> Vec<Node> {
        self.0.with_items(|items| items.to_vec()).unwrap_or_default()
    }

    /// Position of `value`, by identity first and structurally otherwise.
    pub fn index_of(&self, value: &Node) -> Option<usize> {
        self.0
            .with_items(|items| {
                items
                    .iter()
                    .position(|item| Node::ptr_eq(item, value))
                    .or_else(|| items.iter().position(|item| item == value))
            })
            .flatten()
    }

    pub fn push(&self, value: impl Into<Node>) -> Node {
        let child = self.0.include(value.into());
        self.0.with_items_mut(|items| items.push(child.clone()));
        self.0.update();
        child
    }

    pub fn insert(&self, index: usize, value: impl Into<Node>) -> Result<Node> {
        let len = self.len();
        if index > len {
            return Err(PdfError::IndexOutOfRange { index, len });
        }
        let child = self.0.include(value.into());
        self.0.with_items_mut(|items| items.insert(index, child.clone()));
        self.0.update();
        Ok(child)
    }

    /// Replaces the entry at `index`. Returns the node actually stored.
    pub fn set(&self, index: usize, value: impl Into<Node>) -> Result<Node> {
        let len = self.len();
        if index >= len {
            return Err(PdfError::IndexOutOfRange { index, len });
        }
        let value = value.into();
        if self
            .get_raw(index)
            .is_some_and(|current| Node::ptr_eq(&current, &value))
        {
            self.0.update();
            return Ok(value);
        }

        let child = self.0.include(value);
        let previous = self
            .0
            .with_items_mut(|items| std::mem::replace(&mut items[index], child.clone()));
        if let Some(previous) = previous {
            self.0.exclude(&previous);
        }
        self.0.update();
        Ok(child)
    }

    pub fn remove(&self, index: usize) -> Option<Node> {
        let removed = self
            .0
            .with_items_mut(|items| (index < items.len()).then(|| items.remove(index)))
            .flatten()?;
        self.0.exclude(&removed);
        self.0.update();
        Some(removed)
    }

    pub fn pop(&self) -> Option<Node> {
        let removed = self.0.with_items_mut(|items| items.pop()).flatten()?;
        self.0.exclude(&removed);
        self.0.update();
        Some(removed)
    }

    pub fn clear(&self) {
        let removed = self
            .0
            .with_items_mut(std::mem::take)
            .unwrap_or_default();
        for node in &removed {
            self.0.exclude(node);
        }
        self.0.update();
    }

    /// Entry at `index` if it has the requested shape; otherwise a Virtual
    /// placeholder of that shape is stored there (padding with Virtual
    /// nulls past the end) and returned. Never fails.
    pub fn get_or_create(&self, index: usize, key: TypeKey) -> Node {
        if let Some(existing) = self.get_typed(index, key) {
            return existing;
        }

        let len = self.len();
        let padding: Vec<Node> = (len..index)
            .map(|_| self.0.include(Node::placeholder(TypeKey::Any)))
            .collect();
        let placeholder = self.0.include(Node::placeholder(key));

        let replaced = self
            .0
            .with_items_mut(|items| {
                items.extend(padding);
                if index < items.len() {
                    Some(std::mem::replace(&mut items[index], placeholder.clone()))
                } else {
                    items.push(placeholder.clone());
                    None
                }
            })
            .flatten();

        if let Some(replaced) = replaced {
            self.0.exclude(&replaced);
            self.0.update();
        }
        placeholder
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Node>> for Array {
    fn from(items: Vec<Node>) -> Self {
        Self(Node::new(Value::Array(items)))
    }
}

impl<T: Into<Node>> FromIterator<T> for Array {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<Node>>())
    }
}

#[cfg(test)]
mod tests;
