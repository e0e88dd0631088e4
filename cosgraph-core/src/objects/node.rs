use super::array::Array;
use super::dictionary::Dictionary;
use super::primitive::{Name, PdfDate, PdfString};
use super::reference::Reference;
use super::status::NodeStatus;
use super::stream::{Stream, StreamData};
use super::type_key::TypeKey;
use crate::document::{Document, IndirectObject, SlotInner};
use crate::error::{PdfError, Result};
use crate::visitor::Visitor;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

/// Dictionary entries in insertion order.
pub type Entries = IndexMap<Name, Node>;

/// Payload of a node.
#[derive(Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Name),
    String(PdfString),
    Date(PdfDate),
    Array(Vec<Node>),
    Dictionary(Entries),
    Stream(StreamData),
    Reference(Reference),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Null,
    Boolean,
    Integer,
    Real,
    Name,
    String,
    Date,
    Array,
    Dictionary,
    Stream,
    Reference,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Null => "Null",
            NodeKind::Boolean => "Boolean",
            NodeKind::Integer => "Integer",
            NodeKind::Real => "Real",
            NodeKind::Name => "Name",
            NodeKind::String => "String",
            NodeKind::Date => "Date",
            NodeKind::Array => "Array",
            NodeKind::Dictionary => "Dictionary",
            NodeKind::Stream => "Stream",
            NodeKind::Reference => "Reference",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Array | NodeKind::Dictionary | NodeKind::Stream)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> NodeKind {
        match self {
            Value::Null => NodeKind::Null,
            Value::Boolean(_) => NodeKind::Boolean,
            Value::Integer(_) => NodeKind::Integer,
            Value::Real(_) => NodeKind::Real,
            Value::Name(_) => NodeKind::Name,
            Value::String(_) => NodeKind::String,
            Value::Date(_) => NodeKind::Date,
            Value::Array(_) => NodeKind::Array,
            Value::Dictionary(_) => NodeKind::Dictionary,
            Value::Stream(_) => NodeKind::Stream,
            Value::Reference(_) => NodeKind::Reference,
        }
    }

    fn children(&self) -> Vec<Node> {
        match self {
            Value::Array(items) => items.clone(),
            Value::Dictionary(entries) => entries.values().cloned().collect(),
            Value::Stream(data) => data.dict.values().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Deep copy. Virtual entries are dropped (array positions kept, see
    /// [`written_items`]), references are kept verbatim.
    fn duplicate(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(b) => Value::Boolean(*b),
            Value::Integer(i) => Value::Integer(*i),
            Value::Real(r) => Value::Real(*r),
            Value::Name(n) => Value::Name(n.clone()),
            Value::String(s) => Value::String(s.clone()),
            Value::Date(d) => Value::Date(*d),
            Value::Array(items) => Value::Array(
                written_items(items).iter().map(Node::duplicate).collect(),
            ),
            Value::Dictionary(entries) => Value::Dictionary(duplicate_entries(entries)),
            Value::Stream(data) => Value::Stream(data.duplicate_with(duplicate_entries(&data.dict))),
            Value::Reference(r) => Value::Reference(r.clone()),
        }
    }
}

/// Array items as they are serialized: trailing Virtual items are dropped,
/// Virtual items before a concrete one become nulls so later items keep
/// their index.
pub(crate) fn written_items(items: &[Node]) -> Vec<Node> {
    let len = items
        .iter()
        .rposition(|item| !item.is_virtual())
        .map_or(0, |last| last + 1);
    items[..len]
        .iter()
        .map(|item| if item.is_virtual() { Node::null() } else { item.clone() })
        .collect()
}

fn duplicate_entries(entries: &Entries) -> Entries {
    entries
        .iter()
        .filter(|(_, value)| !value.is_virtual())
        .map(|(key, value)| (key.clone(), value.duplicate()))
        .collect()
}

pub(crate) struct NodeInner {
    status: AtomicU8,
    parent: Mutex<Weak<NodeInner>>,
    holder: Mutex<Weak<SlotInner>>,
    value: RwLock<Value>,
}

/// Shared handle to a node of the object graph.
///
/// Cloning the handle never copies the node: every view built over the
/// same handle observes the same content. A node has at most one direct
/// parent; inserting an already-owned node into another container copies it
/// first (see [`Node::duplicate`]).
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

impl Node {
    pub fn new(value: Value) -> Self {
        Self::with_status(value, NodeStatus::default())
    }

    pub(crate) fn with_status(value: Value, status: NodeStatus) -> Self {
        let node = Node(Arc::new(NodeInner {
            status: AtomicU8::new(status.bits()),
            parent: Mutex::new(Weak::new()),
            holder: Mutex::new(Weak::new()),
            value: RwLock::new(Value::Null),
        }));
        let value = node.adopt_children(value);
        *node.0.value.write() = value;
        node
    }

    /// Auto-vivified placeholder of the requested kind.
    pub(crate) fn placeholder(key: TypeKey) -> Self {
        Self::with_status(
            key.placeholder_value(),
            NodeStatus::UPDATEABLE | NodeStatus::VIRTUAL,
        )
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(Value::Boolean(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::new(Value::Integer(value))
    }

    pub fn real(value: f64) -> Self {
        Self::new(Value::Real(value))
    }

    pub fn name(value: impl Into<Name>) -> Self {
        Self::new(Value::Name(value.into()))
    }

    pub fn string(value: impl Into<PdfString>) -> Self {
        Self::new(Value::String(value.into()))
    }

    pub fn date(value: PdfDate) -> Self {
        Self::new(Value::Date(value))
    }

    pub fn reference(value: Reference) -> Self {
        Self::new(Value::Reference(value))
    }

    /// Identity comparison. `==` compares structurally.
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn kind(&self) -> NodeKind {
        self.0.value.read_recursive().kind()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.0.value.read_recursive()
    }

    // ----- status -----

    pub fn status(&self) -> NodeStatus {
        NodeStatus::from_bits_truncate(self.0.status.load(Ordering::Acquire))
    }

    pub fn is_updated(&self) -> bool {
        self.status().contains(NodeStatus::UPDATED)
    }

    pub fn is_virtual(&self) -> bool {
        self.status().contains(NodeStatus::VIRTUAL)
    }

    pub fn is_original(&self) -> bool {
        self.status().contains(NodeStatus::ORIGINAL)
    }

    pub fn is_updateable(&self) -> bool {
        self.status().contains(NodeStatus::UPDATEABLE)
    }

    /// Turns change tracking on or off for this node only.
    pub fn set_updateable(&self, updateable: bool) {
        if updateable {
            self.0
                .status
                .fetch_or(NodeStatus::UPDATEABLE.bits(), Ordering::AcqRel);
        } else {
            self.0
                .status
                .fetch_and(!NodeStatus::UPDATEABLE.bits(), Ordering::AcqRel);
        }
    }

    /// Marks this node and its ancestors as updated and clears their
    /// Virtual bit. When the walk reaches the data of an original indirect
    /// slot, the slot is registered for rewrite. Stops at the first node
    /// that does not track changes.
    pub fn update(&self) {
        let mut current = self.clone();
        loop {
            if !current.is_updateable() {
                return;
            }
            current
                .0
                .status
                .fetch_or(NodeStatus::UPDATED.bits(), Ordering::AcqRel);
            current
                .0
                .status
                .fetch_and(!NodeStatus::VIRTUAL.bits(), Ordering::AcqRel);

            match current.parent() {
                Some(parent) => current = parent,
                None => {
                    if let Some(slot) = current.holder() {
                        slot.mark_modified();
                    }
                    return;
                }
            }
        }
    }

    // ----- ownership -----

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.lock().upgrade().map(Node)
    }

    /// Topmost ancestor (the node itself if it has no parent).
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// The indirect slot whose data this node is, if any.
    pub fn holder(&self) -> Option<IndirectObject> {
        self.0.holder.lock().upgrade().map(IndirectObject)
    }

    pub(crate) fn set_holder(&self, slot: &IndirectObject) {
        *self.0.holder.lock() = Arc::downgrade(&slot.0);
    }

    pub(crate) fn clear_holder(&self) {
        *self.0.holder.lock() = Weak::new();
    }

    /// Owning document, found through the root's indirect slot.
    pub fn document(&self) -> Option<Document> {
        self.root().holder().and_then(|slot| slot.document())
    }

    pub(crate) fn is_owned(&self) -> bool {
        self.0.parent.lock().upgrade().is_some() || self.0.holder.lock().upgrade().is_some()
    }

    fn is_ancestor_of(&self, node: &Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if Node::ptr_eq(self, &candidate) {
                return true;
            }
            current = candidate.parent();
        }
        false
    }

    /// Attaches `child` to this container, copying it first if it is
    /// already owned elsewhere or would close a cycle. Returns the node
    /// actually attached.
    pub(crate) fn include(&self, child: Node) -> Node {
        let child = if child.is_owned() || child.is_ancestor_of(self) {
            child.duplicate()
        } else {
            child
        };
        *child.0.parent.lock() = Arc::downgrade(&self.0);
        child
    }

    /// Detaches `child` if this container is its parent.
    pub(crate) fn exclude(&self, child: &Node) {
        let mut parent = child.0.parent.lock();
        if parent
            .upgrade()
            .is_some_and(|current| Arc::ptr_eq(&current, &self.0))
        {
            *parent = Weak::new();
        }
    }

    fn adopt_children(&self, value: Value) -> Value {
        match value {
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.include(item)).collect())
            }
            Value::Dictionary(entries) => Value::Dictionary(self.adopt_entries(entries)),
            Value::Stream(mut data) => {
                data.dict = self.adopt_entries(std::mem::take(&mut data.dict));
                Value::Stream(data)
            }
            other => other,
        }
    }

    fn adopt_entries(&self, entries: Entries) -> Entries {
        entries
            .into_iter()
            .map(|(key, value)| (key, self.include(value)))
            .collect()
    }

    fn reparent_children(&self) {
        for child in self.children() {
            *child.0.parent.lock() = Arc::downgrade(&self.0);
        }
    }

    /// Direct children in order (array items, dictionary or stream
    /// dictionary values).
    pub fn children(&self) -> Vec<Node> {
        self.read().children()
    }

    // ----- structural operations -----

    /// Exchanges the payload of two nodes of the same kind. Handles to
    /// either node keep pointing at the same instance.
    pub fn swap(&self, other: &Node) -> Result<()> {
        if Node::ptr_eq(self, other) {
            return Ok(());
        }
        let (mine, theirs) = (self.kind(), other.kind());
        if mine != theirs {
            return Err(PdfError::TypeMismatch {
                expected: mine.as_str(),
                found: theirs.as_str(),
            });
        }
        if self.is_ancestor_of(other) || other.is_ancestor_of(self) {
            return Err(PdfError::structural(
                "cannot swap a node with one of its descendants",
            ));
        }

        {
            let (first, second) = if self.addr() < other.addr() {
                (self, other)
            } else {
                (other, self)
            };
            let mut first_value = first.0.value.write();
            let mut second_value = second.0.value.write();
            std::mem::swap(&mut *first_value, &mut *second_value);
        }

        self.reparent_children();
        other.reparent_children();
        self.update();
        other.update();
        Ok(())
    }

    /// Explicit deep copy. The copy has no parent and no slot, keeps only
    /// the Updateable bit, and shares no mutable state with the original.
    pub fn duplicate(&self) -> Node {
        let value = self.read().duplicate();
        Node::with_status(value, self.status() & NodeStatus::UPDATEABLE)
    }

    /// Dereferences a Reference node; any other node resolves to itself.
    pub fn resolve(&self) -> Result<Option<Node>> {
        match self.as_reference() {
            Some(reference) => reference.resolve(),
            None => Ok(Some(self.clone())),
        }
    }

    pub fn accept(&self, visitor: &mut dyn Visitor) -> Result<Node> {
        visitor.visit(self)
    }

    /// Replaces a String payload with the equivalent Date in place. Not a
    /// modification: the node is not marked updated.
    pub(crate) fn upgrade_to_date(&self) -> bool {
        let mut value = self.0.value.write();
        let date = match &*value {
            Value::Date(_) => return true,
            Value::String(s) => PdfDate::parse(s.as_bytes()),
            _ => None,
        };
        match date {
            Some(date) => {
                *value = Value::Date(date);
                true
            }
            None => false,
        }
    }

    /// Rebinds detached references (parsed before their document existed).
    pub(crate) fn bind_references(&self, document: &Document) {
        {
            let mut value = self.0.value.write();
            if let Value::Reference(reference) = &mut *value {
                if reference.document_id() == 0 {
                    *reference = Reference::new(reference.id(), document);
                }
            }
        }
        for child in self.children() {
            child.bind_references(document);
        }
    }

    // ----- container access -----

    pub(crate) fn with_entries<R>(&self, f: impl FnOnce(&Entries) -> R) -> Option<R> {
        match &*self.read() {
            Value::Dictionary(entries) => Some(f(entries)),
            Value::Stream(data) => Some(f(&data.dict)),
            _ => None,
        }
    }

    pub(crate) fn with_entries_mut<R>(&self, f: impl FnOnce(&mut Entries) -> R) -> Option<R> {
        match &mut *self.0.value.write() {
            Value::Dictionary(entries) => Some(f(entries)),
            Value::Stream(data) => Some(f(&mut data.dict)),
            _ => None,
        }
    }

    pub(crate) fn with_items<R>(&self, f: impl FnOnce(&[Node]) -> R) -> Option<R> {
        match &*self.read() {
            Value::Array(items) => Some(f(items)),
            _ => None,
        }
    }

    pub(crate) fn with_items_mut<R>(&self, f: impl FnOnce(&mut Vec<Node>) -> R) -> Option<R> {
        match &mut *self.0.value.write() {
            Value::Array(items) => Some(f(items)),
            _ => None,
        }
    }

    pub(crate) fn with_stream<R>(&self, f: impl FnOnce(&StreamData) -> R) -> Option<R> {
        match &*self.read() {
            Value::Stream(data) => Some(f(data)),
            _ => None,
        }
    }

    pub(crate) fn with_stream_mut<R>(&self, f: impl FnOnce(&mut StreamData) -> R) -> Option<R> {
        match &mut *self.0.value.write() {
            Value::Stream(data) => Some(f(data)),
            _ => None,
        }
    }

    // ----- atom accessors -----

    pub fn is_null(&self) -> bool {
        self.kind() == NodeKind::Null
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &*self.read() {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match &*self.read() {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or Real as a float.
    pub fn as_real(&self) -> Option<f64> {
        match &*self.read() {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<Name> {
        match &*self.read() {
            Value::Name(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// String payload; a Date is returned in its on-disk spelling.
    pub fn as_string(&self) -> Option<PdfString> {
        match &*self.read() {
            Value::String(s) => Some(s.clone()),
            Value::Date(d) => Some(PdfString::from(d.to_pdf_string())),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<PdfDate> {
        match &*self.read() {
            Value::Date(d) => Some(*d),
            Value::String(s) => PdfDate::parse(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Reference> {
        match &*self.read() {
            Value::Reference(r) => Some(r.clone()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<Array> {
        (self.kind() == NodeKind::Array).then(|| Array::from_node(self.clone()))
    }

    /// Dictionary view; also valid over a Stream's dictionary.
    pub fn as_dictionary(&self) -> Option<Dictionary> {
        matches!(self.kind(), NodeKind::Dictionary | NodeKind::Stream)
            .then(|| Dictionary::from_node(self.clone()))
    }

    pub fn as_stream(&self) -> Option<Stream> {
        (self.kind() == NodeKind::Stream).then(|| Stream::from_node(self.clone()))
    }

    // ----- atom setters -----

    fn assign_atom(&self, value: Value, accepted: &[NodeKind]) -> Result<()> {
        {
            let mut current = self.0.value.write();
            let found = current.kind();
            if !accepted.contains(&found) {
                return Err(PdfError::TypeMismatch {
                    expected: accepted[0].as_str(),
                    found: found.as_str(),
                });
            }
            *current = value;
        }
        self.update();
        Ok(())
    }

    pub fn set_bool(&self, value: bool) -> Result<()> {
        self.assign_atom(Value::Boolean(value), &[NodeKind::Boolean])
    }

    pub fn set_integer(&self, value: i64) -> Result<()> {
        self.assign_atom(Value::Integer(value), &[NodeKind::Integer])
    }

    /// Accepts an Integer node too; the node becomes a Real.
    pub fn set_real(&self, value: f64) -> Result<()> {
        self.assign_atom(Value::Real(value), &[NodeKind::Real, NodeKind::Integer])
    }

    pub fn set_name(&self, value: impl Into<Name>) -> Result<()> {
        self.assign_atom(Value::Name(value.into()), &[NodeKind::Name])
    }

    pub fn set_string(&self, value: impl Into<PdfString>) -> Result<()> {
        self.assign_atom(
            Value::String(value.into()),
            &[NodeKind::String, NodeKind::Date],
        )
    }

    pub fn set_date(&self, value: PdfDate) -> Result<()> {
        self.assign_atom(Value::Date(value), &[NodeKind::Date, NodeKind::String])
    }

    pub fn set_reference(&self, value: Reference) -> Result<()> {
        self.assign_atom(Value::Reference(value), &[NodeKind::Reference])
    }
}

fn entries_equal(a: &Entries, b: &Entries) -> bool {
    let concrete = |entries: &Entries| entries.values().filter(|v| !v.is_virtual()).count();
    concrete(a) == concrete(b)
        && a.iter().filter(|(_, v)| !v.is_virtual()).all(|(key, value)| {
            b.get(key)
                .is_some_and(|other| !other.is_virtual() && value == other)
        })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Real(x), Value::Real(y)) => x == y,
        (Value::Name(x), Value::Name(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::String(s), Value::Date(d)) | (Value::Date(d), Value::String(s)) => {
            PdfDate::parse(s.as_bytes()) == Some(*d)
        }
        (Value::Array(x), Value::Array(y)) => written_items(x) == written_items(y),
        (Value::Dictionary(x), Value::Dictionary(y)) => entries_equal(x, y),
        (Value::Stream(x), Value::Stream(y)) => {
            entries_equal(&x.dict, &y.dict) && x.same_body(y)
        }
        (Value::Reference(x), Value::Reference(y)) => x == y,
        _ => false,
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if Node::ptr_eq(self, other) {
            return true;
        }
        let mine = self.read();
        let theirs = other.read();
        values_equal(&mine, &theirs)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.value.try_read_recursive() {
            Some(value) => f.debug_tuple("Node").field(&*value).finish(),
            None => f.write_str("Node(<locked>)"),
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::null()
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::new(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::boolean(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::integer(value as i64)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::integer(value)
    }
}

impl From<u32> for Node {
    fn from(value: u32) -> Self {
        Node::integer(value as i64)
    }
}

impl From<usize> for Node {
    fn from(value: usize) -> Self {
        Node::integer(value as i64)
    }
}

impl From<f32> for Node {
    fn from(value: f32) -> Self {
        Node::real(value as f64)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::real(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::string(value)
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::string(value)
    }
}

impl From<Name> for Node {
    fn from(value: Name) -> Self {
        Node::name(value)
    }
}

impl From<PdfString> for Node {
    fn from(value: PdfString) -> Self {
        Node::string(value)
    }
}

impl From<PdfDate> for Node {
    fn from(value: PdfDate) -> Self {
        Node::date(value)
    }
}

impl From<Reference> for Node {
    fn from(value: Reference) -> Self {
        Node::reference(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::new(Value::Array(items))
    }
}

impl From<Array> for Node {
    fn from(array: Array) -> Self {
        array.into_node()
    }
}

impl From<Dictionary> for Node {
    fn from(dict: Dictionary) -> Self {
        dict.into_node()
    }
}

impl From<Stream> for Node {
    fn from(stream: Stream) -> Self {
        stream.into_node()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_atom_constructors_and_accessors() {
        assert!(Node::null().is_null());
        assert_eq!(Node::from(true).as_bool(), Some(true));
        assert_eq!(Node::from(42).as_integer(), Some(42));
        assert_eq!(Node::from(42).as_real(), Some(42.0));
        assert_eq!(Node::from(1.5).as_real(), Some(1.5));
        assert_eq!(Node::name("Page").as_name(), Some(Name::new("Page")));
        assert_eq!(
            Node::from("Hello").as_string().map(|s| s.to_string_lossy()),
            Some("Hello".to_string())
        );
    }

    #[test]
    fn test_new_node_is_updateable_not_updated() {
        let node = Node::integer(1);
        assert!(node.is_updateable());
        assert!(!node.is_updated());
        assert!(!node.is_virtual());
        assert!(!node.is_original());
    }

    #[test]
    fn test_setter_marks_updated() {
        let node = Node::integer(1);
        node.set_integer(2).unwrap();
        assert_eq!(node.as_integer(), Some(2));
        assert!(node.is_updated());
    }

    #[test]
    fn test_setter_kind_mismatch() {
        let node = Node::name("Page");
        let err = node.set_integer(5).unwrap_err();
        assert!(matches!(
            err,
            PdfError::TypeMismatch {
                expected: "Integer",
                found: "Name"
            }
        ));
        assert_eq!(node.as_name(), Some(Name::new("Page")));
        assert!(!node.is_updated());
    }

    #[test]
    fn test_set_real_on_integer_converts() {
        let node = Node::integer(3);
        node.set_real(3.5).unwrap();
        assert_eq!(node.kind(), NodeKind::Real);
    }

    #[test]
    fn test_update_ignored_without_updateable() {
        let node = Node::integer(1);
        node.set_updateable(false);
        node.set_integer(7).unwrap();
        assert_eq!(node.as_integer(), Some(7));
        assert!(!node.is_updated());
    }

    #[test]
    fn test_update_propagates_to_parent() {
        let dict = Dictionary::new();
        let child = dict.set("Count", 1);
        assert!(dict.node().is_updated());

        let fresh = Dictionary::new();
        let inner = fresh.set("Inner", Dictionary::new());
        let leaf = inner.as_dictionary().unwrap().set("Leaf", 0);
        assert!(Node::ptr_eq(&leaf.parent().unwrap(), &inner));
        assert!(Node::ptr_eq(&leaf.root(), fresh.node()));
        child.set_integer(2).unwrap();
        assert!(child.is_updated());
    }

    #[test]
    fn test_include_copies_owned_child() {
        let first = Dictionary::new();
        let second = Dictionary::new();
        let shared = first.set("Value", Array::new());

        let attached = second.set("Value", shared.clone());

        assert!(!Node::ptr_eq(&shared, &attached));
        assert_eq!(shared, attached);
        assert!(Node::ptr_eq(&shared.parent().unwrap(), first.node()));
        assert!(Node::ptr_eq(&attached.parent().unwrap(), second.node()));
    }

    #[test]
    fn test_include_breaks_cycles() {
        let dict = Dictionary::new();
        let attached = dict.set("Self", dict.clone());
        assert!(!Node::ptr_eq(&attached, dict.node()));
        assert_eq!(attached.kind(), NodeKind::Dictionary);
    }

    #[test]
    fn test_remove_detaches_child() {
        let dict = Dictionary::new();
        let child = dict.set("Key", 1);
        let removed = dict.remove("Key").unwrap();
        assert!(Node::ptr_eq(&child, &removed));
        assert!(removed.parent().is_none());
    }

    #[test]
    fn test_swap_exchanges_payload_and_reparents() {
        let a = Dictionary::new();
        let b = Dictionary::new();
        let a_child = a.set("A", 1);
        b.set("B", 2);

        a.node().swap(b.node()).unwrap();

        assert!(a.contains_key("B"));
        assert!(b.contains_key("A"));
        assert!(Node::ptr_eq(&a_child.parent().unwrap(), b.node()));
        assert!(a.node().is_updated());
        assert!(b.node().is_updated());
    }

    #[test]
    fn test_swap_kind_mismatch() {
        let a = Node::integer(1);
        let b = Node::name("X");
        assert!(matches!(a.swap(&b), Err(PdfError::TypeMismatch { .. })));
    }

    #[test]
    fn test_duplicate_is_deep_and_skips_virtual() {
        let dict = Dictionary::new();
        dict.set("Keep", 1);
        dict.get_or_create("Ghost", TypeKey::Dictionary);

        let copy = dict.node().duplicate();
        let copy = copy.as_dictionary().unwrap();

        assert!(copy.contains_key("Keep"));
        assert!(!copy.contains_key("Ghost"));
        assert!(copy.node().parent().is_none());

        copy.set("Keep", 2);
        assert_eq!(dict.get_integer("Keep"), Some(1));
    }

    #[test]
    fn test_structural_equality_ignores_virtual_entries() {
        let a = Dictionary::new();
        let b = Dictionary::new();
        a.set("Type", Name::new("Page"));
        b.set("Type", Name::new("Page"));
        b.get_or_create("Resources", TypeKey::Dictionary);

        assert_eq!(a.node(), b.node());
        assert!(!Node::ptr_eq(a.node(), b.node()));
    }

    #[test]
    fn test_string_equals_matching_date() {
        let date = PdfDate::parse(b"D:20240101000000Z").unwrap();
        assert_eq!(Node::string("D:20240101000000Z"), Node::date(date));
        assert_ne!(Node::string("D:20250101000000Z"), Node::date(date));
    }

    #[test]
    fn test_as_date_parses_string() {
        let node = Node::string("D:20240101");
        assert!(node.as_date().is_some());
        assert_eq!(node.kind(), NodeKind::String);
    }

    #[test]
    fn test_node_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Node>();
    }
}
