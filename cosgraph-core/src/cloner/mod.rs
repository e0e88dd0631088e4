//! Deep copies of subgraphs into a target document
//!
//! A [`Cloner`] is bound to one target document. References into the target
//! are kept as they are; references into any other document ("alien"
//! references) adopt the referenced object into the target table under a
//! fresh number. A slot is reserved and mapped before its data is copied,
//! so reference cycles terminate.
//!
//! The reference mapping lives for one top-level call (`clone_node`,
//! `clone_reference` or `clone_all`): cloning the same subgraph twice
//! yields two independent copies.
//!
//! Dictionaries are matched against an ordered list of [`Filter`]s; the
//! first match decides which entries are copied and what fix-ups happen
//! afterwards.

mod filter;

pub use filter::Filter;

use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{
    written_items, Body, Dictionary, Entries, Name, Node, Reference, Stream, StreamData, Value,
};
use crate::visitor::Visitor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Stream types that describe file structure and cannot be copied.
const STRUCTURAL_STREAM_TYPES: [&str; 2] = ["ObjStm", "XRef"];

pub struct Cloner {
    target: Document,
    filters: Vec<Filter>,
    mapped: HashMap<Reference, Reference>,
    /// Source roots of the slots being adopted, with their new references
    adopting: Vec<(Node, Reference)>,
    /// Reference of the copy whose after-clone hook is running
    current: Option<Reference>,
    depth: usize,
}

impl Cloner {
    /// Cloner with the default filters (field, named destination,
    /// annotation, page).
    pub fn new(target: &Document) -> Self {
        Self::with_filters(target, Filter::defaults())
    }

    /// Cloner that copies every entry verbatim.
    pub fn without_filters(target: &Document) -> Self {
        Self::with_filters(target, Vec::new())
    }

    pub fn with_filters(target: &Document, filters: Vec<Filter>) -> Self {
        Self {
            target: target.clone(),
            filters,
            mapped: HashMap::new(),
            adopting: Vec::new(),
            current: None,
            depth: 0,
        }
    }

    pub fn target(&self) -> &Document {
        &self.target
    }

    /// Filters in priority order. The first match wins.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut Vec<Filter> {
        &mut self.filters
    }

    /// Copies `node` for the target document.
    pub fn clone_node(&mut self, node: &Node) -> Result<Node> {
        self.scoped(|cloner| cloner.copy(node))
    }

    /// Reference to the target's counterpart of `reference`; `None` when
    /// the referenced object does not resolve.
    pub fn clone_reference(&mut self, reference: &Reference) -> Result<Option<Reference>> {
        let copy = self.scoped(|cloner| cloner.map_reference(reference))?;
        Ok(copy.as_reference())
    }

    /// Copies several nodes with one shared mapping, so references between
    /// them stay consistent in the copies.
    pub fn clone_all(&mut self, nodes: &[Node]) -> Result<Vec<Node>> {
        self.scoped(|cloner| nodes.iter().map(|node| cloner.copy(node)).collect())
    }

    /// Target reference already assigned to `source` in the running call.
    pub fn target_reference_of(&self, source: &Reference) -> Option<Reference> {
        if source.document_id() == self.target.id() {
            return Some(source.clone());
        }
        self.mapped.get(source).cloned()
    }

    /// Reference of the indirect copy currently being finished, if the
    /// dictionary handed to an after-clone hook is the data of one.
    pub fn current_reference(&self) -> Option<&Reference> {
        self.current.as_ref()
    }

    /// Copies `node` within the running call. For use from filter hooks.
    pub fn copy(&mut self, node: &Node) -> Result<Node> {
        if node.is_virtual() {
            return Ok(Node::null());
        }
        self.visit(node)
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        if self.depth == 0 {
            self.mapped.clear();
            self.adopting.clear();
            self.current = None;
        }
        result
    }

    fn map_reference(&mut self, reference: &Reference) -> Result<Node> {
        if reference.document_id() == self.target.id() {
            return Ok(Node::reference(reference.clone()));
        }
        if let Some(mapped) = self.mapped.get(reference) {
            return Ok(Node::reference(mapped.clone()));
        }
        let Some(source) = reference.resolve()? else {
            debug!("Reference {} does not resolve, copied as null", reference);
            return Ok(Node::null());
        };

        let slot = self.target.reserve_object();
        let adopted = Reference::new(slot.id(), &self.target);
        self.mapped.insert(reference.clone(), adopted.clone());
        self.adopting.push((source.clone(), adopted.clone()));
        let result = self.visit(&source);
        self.adopting.pop();

        match result {
            Ok(copy) => {
                slot.attach(copy);
                debug!("Adopted object {} as {}", reference, adopted);
                Ok(Node::reference(adopted))
            }
            Err(err) => {
                self.mapped.remove(reference);
                self.target.discard_object(slot.number());
                Err(err)
            }
        }
    }

    fn adopted_reference_of(&self, source: &Node) -> Option<Reference> {
        self.adopting
            .last()
            .filter(|(root, _)| Node::ptr_eq(root, source))
            .map(|(_, reference)| reference.clone())
    }

    fn filter_for(&self, dict: &Dictionary) -> Filter {
        let filter = self
            .filters
            .iter()
            .find(|filter| (filter.matches)(dict))
            .copied()
            .unwrap_or_else(Filter::passthrough);
        debug!("Cloning dictionary with the {} filter", filter.name);
        filter
    }

    fn copy_entries(&mut self, dict: &Dictionary, filter: &Filter) -> Result<Entries> {
        let mut entries = Entries::new();
        for (key, value) in dict.entries() {
            if value.is_virtual() || !(filter.before_clone)(&key, &value) {
                continue;
            }
            let copy = self.visit(&value)?;
            entries.insert(key, copy);
        }
        Ok(entries)
    }

    fn finish(&mut self, filter: &Filter, source: &Dictionary, copy: &Dictionary) -> Result<()> {
        let previous = self.current.take();
        self.current = self.adopted_reference_of(source.node());
        let result = (filter.after_clone)(self, source, copy);
        self.current = previous;
        result
    }
}

impl Visitor for Cloner {
    fn visit_atom(&mut self, node: &Node) -> Result<Node> {
        Ok(node.duplicate())
    }

    fn visit_array(&mut self, node: &Node) -> Result<Node> {
        let mut items = Vec::new();
        for item in written_items(&node.children()) {
            items.push(self.visit(&item)?);
        }
        Ok(Node::from(items))
    }

    fn visit_dictionary(&mut self, node: &Node) -> Result<Node> {
        let source = Dictionary::from_node(node.clone());
        let filter = self.filter_for(&source);
        let entries = self.copy_entries(&source, &filter)?;
        let copy = Dictionary::from_node(Node::new(Value::Dictionary(entries)));
        self.finish(&filter, &source, &copy)?;
        Ok(copy.into_node())
    }

    fn visit_stream(&mut self, node: &Node) -> Result<Node> {
        let source = Stream::from_node(node.clone());
        let dict = source.dictionary();
        if let Some(kind) = dict.get_name("Type") {
            if STRUCTURAL_STREAM_TYPES.contains(&kind.as_str()) {
                return Err(PdfError::structural(format!(
                    "/{kind} streams cannot be cloned"
                )));
            }
        }

        let external = match source.body() {
            Some(Body::External(path)) => Some(path),
            _ => None,
        };
        let mut entries = Entries::new();
        for (key, value) in dict.entries() {
            // Length is recomputed from the copied body
            if value.is_virtual() || (external.is_none() && key == "Length") {
                continue;
            }
            let copy = self.visit(&value)?;
            entries.insert(key, copy);
        }
        let body = match external {
            Some(path) => Body::External(path),
            None => {
                let bytes = source.raw_data()?;
                entries.insert(Name::new("Length"), Node::integer(bytes.len() as i64));
                Body::Local(Arc::new(bytes.to_vec()))
            }
        };
        Ok(Node::new(Value::Stream(StreamData::new(entries, body))))
    }

    fn visit_reference(&mut self, node: &Node) -> Result<Node> {
        match node.as_reference() {
            Some(reference) => self.map_reference(&reference),
            None => Ok(Node::null()),
        }
    }
}

impl Node {
    /// Copies this node for the cloner's target document.
    pub fn copy_with(&self, cloner: &mut Cloner) -> Result<Node> {
        cloner.clone_node(self)
    }
}
