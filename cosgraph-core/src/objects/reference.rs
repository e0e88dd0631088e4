use super::node::Node;
use super::primitive::ObjectId;
use crate::document::{Document, DocumentInner, IndirectObject};
use crate::error::Result;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Indirect reference `n g R` bound to the document that owns the target.
///
/// Equality and hashing use the owning document's identity and the object
/// id, never the target node.
#[derive(Clone)]
pub struct Reference {
    id: ObjectId,
    document: Weak<DocumentInner>,
    document_id: u64,
}

impl Reference {
    pub fn new(id: ObjectId, document: &Document) -> Self {
        Self {
            id,
            document: Arc::downgrade(&document.0),
            document_id: document.id(),
        }
    }

    /// Reference not yet bound to a document (document id 0).
    pub(crate) fn detached(id: ObjectId) -> Self {
        Self {
            id,
            document: Weak::new(),
            document_id: 0,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn number(&self) -> u32 {
        self.id.number()
    }

    pub fn generation(&self) -> u16 {
        self.id.generation()
    }

    pub fn document_id(&self) -> u64 {
        self.document_id
    }

    pub fn document(&self) -> Option<Document> {
        self.document.upgrade().map(Document)
    }

    pub fn indirect(&self) -> Option<IndirectObject> {
        self.document()?.indirect(self.number())
    }

    /// Target node, materializing it if needed. `None` when the document is
    /// gone or the slot is free, unknown or of another generation.
    pub fn resolve(&self) -> Result<Option<Node>> {
        match self.document() {
            Some(document) => document.object(self.id),
            None => Ok(None),
        }
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.document_id == other.document_id && self.id == other.id
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.document_id.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({} @{})", self.id, self.document_id)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}
