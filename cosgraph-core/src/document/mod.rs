//! Documents, their object tables and indirect slots

mod indirect;
mod loader;
mod table;
mod xref;

pub use indirect::IndirectObject;
pub(crate) use indirect::SlotInner;
pub use loader::{BufferLoader, ObjectLoader};
pub use table::ObjectTable;
pub use xref::{EntryUsage, XRefEntry, MAX_GENERATION};

use crate::error::{PdfError, Result};
use crate::objects::{Array, Dictionary, Name, Node, NodeKind, ObjectId, Reference, Stream, StreamDecoder};
use crate::parser::{self, ObjectStreamIndex};
use crate::visitor::Visitor;
use parking_lot::{Mutex, ReentrantMutex, RwLock, RwLockReadGuard};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Configuration for loading and tracking a document
#[derive(Clone)]
pub struct DocumentOptions {
    /// Give materialized nodes the Updateable bit so edits are recorded
    pub track_changes: bool,
    /// Tolerate damaged files: missing `endobj`, header mismatches, wrong
    /// stream lengths
    pub lenient: bool,
    /// Codec used to decode filtered streams
    pub decoder: Option<Arc<dyn StreamDecoder>>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            track_changes: true,
            lenient: false,
            decoder: None,
        }
    }
}

impl DocumentOptions {
    /// Options for reading damaged files
    pub fn lenient() -> Self {
        Self::default().with_lenient(true)
    }

    pub fn with_track_changes(mut self, enabled: bool) -> Self {
        self.track_changes = enabled;
        self
    }

    pub fn with_lenient(mut self, enabled: bool) -> Self {
        self.lenient = enabled;
        self
    }

    pub fn with_decoder(mut self, decoder: impl StreamDecoder + 'static) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }
}

impl fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("track_changes", &self.track_changes)
            .field("lenient", &self.lenient)
            .field("decoder", &self.decoder.is_some())
            .finish()
    }
}

pub struct DocumentInner {
    id: u64,
    options: DocumentOptions,
    pub(crate) table: RwLock<ObjectTable>,
    trailer: Node,
    pub(crate) loader: Option<Arc<dyn ObjectLoader>>,
    /// Serializes first-time materialization. Reentrant so that loading an
    /// object may load the objects it depends on.
    pub(crate) load_lock: ReentrantMutex<()>,
    object_streams: Mutex<HashMap<u32, Arc<ObjectStreamIndex>>>,
}

/// A document: trailer, object table and the source the objects load from.
/// Cloning the handle shares the document.
#[derive(Clone)]
pub struct Document(pub(crate) Arc<DocumentInner>);

impl Document {
    /// Empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        Self::with_options(DocumentOptions::default())
    }

    pub fn with_options(options: DocumentOptions) -> Self {
        let document = Self::empty(options, None, Dictionary::new().into_node());

        let pages = Dictionary::new();
        pages.set("Type", Name::new("Pages"));
        pages.set("Kids", Array::new());
        pages.set("Count", 0);
        let pages = document.add_object(pages);

        let catalog = Dictionary::new();
        catalog.set("Type", Name::new("Catalog"));
        catalog.set("Pages", pages);
        let catalog = document.add_object(catalog);

        document.trailer().set("Root", catalog);
        document
    }

    /// Loads a document from the bytes of a file. Objects are parsed on
    /// first access.
    pub fn load(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::load_with_options(data, DocumentOptions::default())
    }

    pub fn load_with_options(data: impl Into<Arc<[u8]>>, options: DocumentOptions) -> Result<Self> {
        let data: Arc<[u8]> = data.into();
        let xref = parser::read_xref(&data, &options)?;
        debug!(
            "Read cross-reference data: {} entries",
            xref.entries.len()
        );
        let loader = Arc::new(BufferLoader::new(data));
        Ok(Self::from_parts(options, loader, xref.entries, xref.trailer))
    }

    /// Assembles a document from an already-read cross-reference table.
    /// Detached references in `trailer` are bound to the new document.
    pub fn from_parts(
        options: DocumentOptions,
        loader: Arc<dyn ObjectLoader>,
        entries: impl IntoIterator<Item = (u32, XRefEntry)>,
        trailer: Node,
    ) -> Self {
        let trailer = if trailer.is_owned() {
            trailer.duplicate()
        } else {
            trailer
        };
        let document = Self::empty(options, Some(loader), trailer);
        {
            let mut table = document.0.table.write();
            for (number, entry) in entries {
                if number == 0 {
                    continue;
                }
                if entry.is_compressed() {
                    table.add_member(entry.stream_number, number);
                }
                table.insert(IndirectObject::new(number, &document, entry, true));
            }
        }
        document.0.trailer.bind_references(&document);
        document
    }

    fn empty(options: DocumentOptions, loader: Option<Arc<dyn ObjectLoader>>, trailer: Node) -> Self {
        Document(Arc::new(DocumentInner {
            id: NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed),
            options,
            table: RwLock::new(ObjectTable::new()),
            trailer,
            loader,
            load_lock: ReentrantMutex::new(()),
            object_streams: Mutex::new(HashMap::new()),
        }))
    }

    /// Process-unique identity of this document.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn ptr_eq(a: &Document, b: &Document) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.0.options
    }

    pub fn trailer(&self) -> Dictionary {
        Dictionary::from_node(self.0.trailer.clone())
    }

    pub fn catalog(&self) -> Option<Dictionary> {
        self.trailer().get_dictionary("Root")
    }

    /// Read access to the object table. Do not mutate the graph while
    /// holding the guard.
    pub fn table(&self) -> RwLockReadGuard<'_, ObjectTable> {
        self.0.table.read()
    }

    pub fn object_count(&self) -> usize {
        self.0.table.read().len()
    }

    pub fn indirect(&self, number: u32) -> Option<IndirectObject> {
        self.0.table.read().get(number).cloned()
    }

    /// Data of object `id`, materialized on first access. `None` for
    /// unknown or free slots and for generation mismatches.
    pub fn object(&self, id: ObjectId) -> Result<Option<Node>> {
        let Some(slot) = self.indirect(id.number()) else {
            return Ok(None);
        };
        if slot.generation() != id.generation() {
            return Ok(None);
        }
        slot.object()
    }

    pub(crate) fn read_bytes(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        match &self.0.loader {
            Some(loader) => loader.read_bytes(offset, length),
            None => Err(PdfError::structural("document has no backing data")),
        }
    }

    /// Stores `value` in a fresh slot and returns its reference.
    pub fn add_object(&self, value: impl Into<Node>) -> Reference {
        let node = value.into();
        let node = if node.is_owned() { node.duplicate() } else { node };
        let slot = self.reserve_object();
        slot.attach(node);
        debug!("Added object {}", slot.number());
        Reference::new(slot.id(), self)
    }

    /// Fresh slot without data.
    pub(crate) fn reserve_object(&self) -> IndirectObject {
        let mut table = self.0.table.write();
        let slot = IndirectObject::new(table.next_number(), self, XRefEntry::in_use(0, 0), false);
        table.insert_created(slot.clone());
        slot
    }

    /// Drops a reserved slot that was never filled.
    pub(crate) fn discard_object(&self, number: u32) {
        self.0.table.write().remove(number);
    }

    /// Replaces the data of an in-use object.
    pub fn replace_object(&self, number: u32, value: impl Into<Node>) -> Result<()> {
        let slot = self
            .indirect(number)
            .ok_or(PdfError::InvalidReference(number, 0))?;
        if slot.entry().is_free() {
            return Err(PdfError::structural(format!("object {number} is free")));
        }
        let node = value.into();
        let node = if node.is_owned() { node.duplicate() } else { node };
        slot.attach(node);
        slot.mark_modified();
        Ok(())
    }

    /// Puts `value` into a free slot, keeping the slot's generation.
    pub fn reuse_object(&self, number: u32, value: impl Into<Node>) -> Result<Reference> {
        let slot = self
            .indirect(number)
            .ok_or(PdfError::InvalidReference(number, 0))?;
        let entry = slot.entry();
        if !entry.is_free() {
            return Err(PdfError::structural(format!(
                "object {number} is in use and cannot be reused"
            )));
        }
        if entry.generation == MAX_GENERATION {
            return Err(PdfError::UnreusableSlot {
                number,
                generation: entry.generation,
            });
        }

        let node = value.into();
        let node = if node.is_owned() { node.duplicate() } else { node };
        slot.set_entry(XRefEntry::in_use(0, entry.generation));
        slot.attach(node);
        slot.mark_modified();
        debug!("Reused object {} generation {}", number, entry.generation);
        Ok(Reference::new(slot.id(), self))
    }

    /// Frees a slot: uncompresses it (and, for an object stream, its
    /// members) first, drops the data and bumps the generation.
    pub fn delete_object(&self, number: u32) -> Result<()> {
        let slot = self
            .indirect(number)
            .ok_or(PdfError::InvalidReference(number, 0))?;
        let entry = slot.entry();
        if entry.is_free() {
            return Ok(());
        }
        if entry.is_compressed() {
            self.uncompress_object(number)?;
        }
        let members = self.0.table.read().members(number);
        for member in members {
            self.uncompress_object(member)?;
        }
        self.0.object_streams.lock().remove(&number);

        let generation = slot.generation().saturating_add(1);
        slot.release(generation);
        slot.mark_modified();
        debug!("Deleted object {}, next generation {}", number, generation);
        Ok(())
    }

    /// New, empty object stream.
    pub fn create_object_stream(&self) -> Reference {
        let dict = Dictionary::new();
        dict.set("Type", Name::new("ObjStm"));
        dict.set("N", 0);
        dict.set("First", 0);
        self.add_object(Stream::with_dictionary(dict, Vec::new()))
    }

    /// Moves object `number` into the object stream `stream_number`.
    ///
    /// Only in-use, uncompressed, non-stream objects of generation 0 are
    /// eligible.
    pub fn compress_object(&self, number: u32, stream_number: u32) -> Result<()> {
        if number == stream_number {
            return Err(PdfError::structural(format!(
                "object {number} cannot be stored in itself"
            )));
        }
        let slot = self
            .indirect(number)
            .ok_or(PdfError::InvalidReference(number, 0))?;
        let entry = slot.entry();
        match entry.usage {
            EntryUsage::Free => {
                return Err(PdfError::structural(format!("object {number} is free")))
            }
            EntryUsage::InUseCompressed => {
                return Err(PdfError::structural(format!(
                    "object {number} is already compressed"
                )))
            }
            EntryUsage::InUse => {}
        }
        if entry.generation != 0 {
            return Err(PdfError::structural(format!(
                "object {number} has generation {}, only generation 0 can be compressed",
                entry.generation
            )));
        }
        if slot.require()?.kind() == NodeKind::Stream {
            return Err(PdfError::structural(format!(
                "object {number} is a stream and cannot be compressed"
            )));
        }
        self.require_object_stream(stream_number)?;

        let index = {
            let table = self.0.table.read();
            table
                .members(stream_number)
                .iter()
                .filter_map(|member| table.get(*member))
                .map(|member| member.entry().stream_index)
                .max()
                .map_or(0, |last| last + 1)
        };
        slot.set_entry(XRefEntry::compressed(stream_number, index));
        {
            let mut table = self.0.table.write();
            table.add_member(stream_number, number);
        }
        slot.mark_modified();
        debug!(
            "Compressed object {} into stream {} at index {}",
            number, stream_number, index
        );
        Ok(())
    }

    /// Moves a compressed object back to standalone storage. Remaining
    /// members keep their indices.
    pub fn uncompress_object(&self, number: u32) -> Result<()> {
        let slot = self
            .indirect(number)
            .ok_or(PdfError::InvalidReference(number, 0))?;
        let entry = slot.entry();
        if !entry.is_compressed() {
            return Err(PdfError::structural(format!(
                "object {number} is not compressed"
            )));
        }
        slot.object()?;

        self.0
            .table
            .write()
            .remove_member(entry.stream_number, number);
        slot.set_entry(XRefEntry::in_use(0, 0));
        slot.mark_modified();
        debug!(
            "Uncompressed object {} from stream {}",
            number, entry.stream_number
        );
        Ok(())
    }

    fn require_object_stream(&self, stream_number: u32) -> Result<Stream> {
        let container = self.indirect(stream_number).ok_or_else(|| {
            PdfError::structural(format!("object stream {stream_number} does not exist"))
        })?;
        if container.entry().usage != EntryUsage::InUse {
            return Err(PdfError::structural(format!(
                "object stream {stream_number} is not a standalone object"
            )));
        }
        container
            .require()?
            .as_stream()
            .filter(|stream| stream.dictionary().is_name("Type", "ObjStm"))
            .ok_or_else(|| {
                PdfError::structural(format!("object {stream_number} is not an object stream"))
            })
    }

    fn object_stream_index(&self, stream_number: u32) -> Result<Arc<ObjectStreamIndex>> {
        if let Some(index) = self.0.object_streams.lock().get(&stream_number).cloned() {
            return Ok(index);
        }
        let stream = self.require_object_stream(stream_number)?;
        let index = Arc::new(ObjectStreamIndex::parse(&stream)?);
        self.0
            .object_streams
            .lock()
            .insert(stream_number, index.clone());
        Ok(index)
    }

    pub(crate) fn extract_compressed(&self, stream_number: u32, index: u32, number: u32) -> Result<Node> {
        let object_stream = self.object_stream_index(stream_number)?;
        object_stream.parse_object(index, number, self)
    }

    /// Original slots changed since loading.
    pub fn modified_objects(&self) -> Vec<IndirectObject> {
        self.0.table.read().modified().cloned().collect()
    }

    /// Slots created in this session.
    pub fn new_objects(&self) -> Vec<IndirectObject> {
        self.0.table.read().created().cloned().collect()
    }

    /// Visits the trailer, then the data of every in-use slot in object
    /// number order.
    pub fn walk(&self, visitor: &mut dyn Visitor) -> Result<()> {
        visitor.visit(&self.0.trailer)?;
        let slots: Vec<IndirectObject> = self.0.table.read().slots().cloned().collect();
        for slot in slots {
            if let Some(node) = slot.object()? {
                visitor.visit(&node)?;
            }
        }
        Ok(())
    }

    /// Leaf pages of the page tree, in document order.
    pub fn pages(&self) -> Vec<Dictionary> {
        let mut pages = Vec::new();
        if let Some(root) = self.catalog().and_then(|catalog| catalog.get_dictionary("Pages")) {
            let mut visited = HashSet::new();
            collect_pages(&root, &mut visited, &mut pages);
        }
        pages
    }

    /// Appends `page` as the last kid of the page tree root.
    pub fn append_page(&self, page: Dictionary) -> Result<Reference> {
        let catalog = self
            .catalog()
            .ok_or_else(|| PdfError::structural("document has no catalog"))?;
        let root = catalog
            .get_raw("Pages")
            .and_then(|node| node.as_reference())
            .ok_or_else(|| PdfError::structural("page tree root is not an indirect object"))?;
        let pages = catalog
            .get_dictionary("Pages")
            .ok_or_else(|| PdfError::structural("page tree root is missing"))?;

        if !page.contains_key("Type") {
            page.set("Type", Name::new("Page"));
        }
        page.set("Parent", root);
        let reference = self.add_object(page);

        pages.get_or_create_array("Kids").push(reference.clone());
        let count = pages.get_integer("Count").unwrap_or(0);
        pages.set("Count", count + 1);
        Ok(reference)
    }
}

fn collect_pages(node: &Dictionary, visited: &mut HashSet<usize>, pages: &mut Vec<Dictionary>) {
    if !visited.insert(node.node().addr()) {
        warn!("Page tree contains a cycle, skipping repeated node");
        return;
    }
    match node.get_array("Kids") {
        Some(kids) if !node.is_name("Type", "Page") => {
            for index in 0..kids.len() {
                if let Some(kid) = kids.get(index).and_then(|kid| kid.as_dictionary()) {
                    collect_pages(&kid, visited, pages);
                }
            }
        }
        _ => pages.push(node.clone()),
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Document::ptr_eq(self, other)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.0.id)
            .field("objects", &self.object_count())
            .field("options", &self.0.options)
            .finish()
    }
}
