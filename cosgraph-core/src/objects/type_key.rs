use super::node::{Node, NodeKind, Value};
use super::primitive::{Name, PdfDate, PdfString};
use super::stream::{Body, StreamData};
use std::sync::Arc;

/// Hint passed alongside a lookup describing the shape the caller expects.
///
/// The same key can hold differently shaped values depending on the
/// container it lives in (`/D` is a destination array in a GoTo action and a
/// dash array in a border style), so lookups resolve against the hint
/// instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeKey {
    #[default]
    Any,
    Boolean,
    Integer,
    /// Integer or Real.
    Number,
    Name,
    String,
    /// A Date, or a String that parses as one (upgraded in place).
    Date,
    Array,
    /// A Dictionary, or the dictionary part of a Stream.
    Dictionary,
    Stream,
}

impl TypeKey {
    /// Returns `node` in the representation this key asks for, or `None` if
    /// the node has the wrong shape.
    pub fn select(self, node: Node) -> Option<Node> {
        if self == TypeKey::Date && node.kind() == NodeKind::String {
            return node.upgrade_to_date().then_some(node);
        }
        self.accepts(node.kind()).then_some(node)
    }

    pub fn accepts(self, kind: NodeKind) -> bool {
        match self {
            TypeKey::Any => true,
            TypeKey::Boolean => kind == NodeKind::Boolean,
            TypeKey::Integer => kind == NodeKind::Integer,
            TypeKey::Number => matches!(kind, NodeKind::Integer | NodeKind::Real),
            TypeKey::Name => kind == NodeKind::Name,
            TypeKey::String => matches!(kind, NodeKind::String | NodeKind::Date),
            TypeKey::Date => kind == NodeKind::Date,
            TypeKey::Array => kind == NodeKind::Array,
            TypeKey::Dictionary => matches!(kind, NodeKind::Dictionary | NodeKind::Stream),
            TypeKey::Stream => kind == NodeKind::Stream,
        }
    }

    pub(crate) fn placeholder_value(self) -> Value {
        match self {
            TypeKey::Any => Value::Null,
            TypeKey::Boolean => Value::Boolean(false),
            TypeKey::Integer | TypeKey::Number => Value::Integer(0),
            TypeKey::Name => Value::Name(Name::new("")),
            TypeKey::String => Value::String(PdfString::new(Vec::new())),
            TypeKey::Date => Value::Date(PdfDate::now()),
            TypeKey::Array => Value::Array(Vec::new()),
            TypeKey::Dictionary => Value::Dictionary(Default::default()),
            TypeKey::Stream => Value::Stream(StreamData::new(
                Default::default(),
                Body::Local(Arc::new(Vec::new())),
            )),
        }
    }
}
