mod array;
mod dictionary;
mod node;
mod primitive;
mod reference;
mod status;
mod stream;
mod type_key;

pub use array::Array;
pub use dictionary::Dictionary;
pub use node::{Entries, Node, NodeKind, Value};
pub(crate) use node::written_items;
pub use primitive::{Name, ObjectId, PdfDate, PdfString};
pub use reference::Reference;
pub use status::NodeStatus;
pub use stream::{Body, Stream, StreamData, StreamDecoder};
pub use type_key::TypeKey;
