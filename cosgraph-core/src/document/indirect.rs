use super::xref::{EntryUsage, XRefEntry};
use super::{Document, DocumentInner};
use crate::error::{PdfError, Result};
use crate::objects::{Node, ObjectId, Reference};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

pub(crate) struct SlotState {
    entry: XRefEntry,
    data: Option<Node>,
    /// Present in the backing bytes the document was loaded from.
    original: bool,
    loading: bool,
}

pub(crate) struct SlotInner {
    number: u32,
    document: Weak<DocumentInner>,
    state: Mutex<SlotState>,
}

/// Indirect slot: object number, cross-reference entry and the lazily
/// materialized data.
#[derive(Clone)]
pub struct IndirectObject(pub(crate) Arc<SlotInner>);

impl IndirectObject {
    pub(crate) fn new(number: u32, document: &Document, entry: XRefEntry, original: bool) -> Self {
        Self(Arc::new(SlotInner {
            number,
            document: Arc::downgrade(&document.0),
            state: Mutex::new(SlotState {
                entry,
                data: None,
                original,
                loading: false,
            }),
        }))
    }

    pub fn number(&self) -> u32 {
        self.0.number
    }

    pub fn generation(&self) -> u16 {
        self.0.state.lock().entry.generation
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::new(self.number(), self.generation())
    }

    pub fn entry(&self) -> XRefEntry {
        self.0.state.lock().entry
    }

    pub(crate) fn set_entry(&self, entry: XRefEntry) {
        self.0.state.lock().entry = entry;
    }

    pub fn is_original(&self) -> bool {
        self.0.state.lock().original
    }

    pub fn is_loaded(&self) -> bool {
        self.0.state.lock().data.is_some()
    }

    pub fn document(&self) -> Option<Document> {
        self.0.document.upgrade().map(Document)
    }

    pub fn reference(&self) -> Option<Reference> {
        let document = self.document()?;
        Some(Reference::new(self.id(), &document))
    }

    /// Data, if already materialized.
    pub fn loaded(&self) -> Option<Node> {
        self.0.state.lock().data.clone()
    }

    /// Data, materializing it on first access.
    ///
    /// Free slots and in-use slots without on-file data resolve to `None`.
    /// First-time loads are serialized by the document's reentrant load
    /// lock, so concurrent callers observe the same node.
    pub fn object(&self) -> Result<Option<Node>> {
        if let Some(node) = self.loaded() {
            return Ok(Some(node));
        }
        let Some(document) = self.document() else {
            return Ok(None);
        };

        let _guard = document.0.load_lock.lock();
        let entry = {
            let mut state = self.0.state.lock();
            if let Some(node) = &state.data {
                return Ok(Some(node.clone()));
            }
            if state.loading {
                return Err(PdfError::structural(format!(
                    "object {} refers to itself while loading",
                    self.number()
                )));
            }
            state.loading = true;
            state.entry
        };

        let result = self.materialize(&document, entry);

        let mut state = self.0.state.lock();
        state.loading = false;
        let node = result?;
        if let Some(node) = &node {
            node.set_holder(self);
            state.data = Some(node.clone());
        }
        Ok(node)
    }

    fn materialize(&self, document: &Document, entry: XRefEntry) -> Result<Option<Node>> {
        match entry.usage {
            EntryUsage::Free => Ok(None),
            EntryUsage::InUse if entry.offset == 0 => Ok(None),
            EntryUsage::InUse => {
                let Some(loader) = document.0.loader.clone() else {
                    return Ok(None);
                };
                debug!("Loading object {} {} at offset {}", self.number(), entry.generation, entry.offset);
                let id = ObjectId::new(self.number(), entry.generation);
                loader.load(document, id, &entry).map(Some)
            }
            EntryUsage::InUseCompressed => {
                debug!(
                    "Extracting object {} from object stream {} at index {}",
                    self.number(),
                    entry.stream_number,
                    entry.stream_index
                );
                document
                    .extract_compressed(entry.stream_number, entry.stream_index, self.number())
                    .map(Some)
            }
        }
    }

    /// Installs `node` as this slot's data, detaching any previous data.
    pub(crate) fn attach(&self, node: Node) {
        node.set_holder(self);
        let previous = self.0.state.lock().data.replace(node);
        if let Some(previous) = previous {
            previous.clear_holder();
        }
    }

    /// Marks the slot free with the given generation and drops its data.
    pub(crate) fn release(&self, generation: u16) {
        let previous = {
            let mut state = self.0.state.lock();
            state.entry = XRefEntry::free(generation);
            state.data.take()
        };
        if let Some(previous) = previous {
            previous.clear_holder();
        }
    }

    /// Registers this slot for rewrite if it came from the backing bytes.
    pub fn mark_modified(&self) {
        if !self.is_original() {
            return;
        }
        if let Some(document) = self.document() {
            document.0.table.write().mark_modified(self.number());
        }
    }

    /// The slot's data, or an error naming the slot.
    pub(crate) fn require(&self) -> Result<Node> {
        self.object()?.ok_or_else(|| {
            PdfError::structural(format!("object {} has no data", self.number()))
        })
    }
}

impl fmt::Debug for IndirectObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.state.try_lock() {
            Some(state) => f
                .debug_struct("IndirectObject")
                .field("number", &self.0.number)
                .field("entry", &state.entry)
                .field("loaded", &state.data.is_some())
                .finish(),
            None => write!(f, "IndirectObject({}, <locked>)", self.0.number),
        }
    }
}

impl PartialEq for IndirectObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
