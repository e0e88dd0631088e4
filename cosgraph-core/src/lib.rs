//! # cosgraph
//!
//! A lazy, change-tracked object graph for PDF documents, with cross-document
//! cloning.
//!
//! ## Features
//!
//! - **Shared nodes**: arrays, dictionaries and streams are views over shared
//!   node handles; every view of one node sees the same content
//! - **Single owner**: a node has at most one direct parent, inserting an
//!   owned node into a second container copies it
//! - **Lazy loading**: indirect objects are parsed on first access, including
//!   objects stored inside object streams
//! - **Change tracking**: mutations propagate to the owning indirect object,
//!   which is registered for incremental rewrite
//! - **Cloning**: deep copies between documents with page, annotation, form
//!   field and named destination fix-ups
//!
//! ## Quick Start
//!
//! ```rust
//! use cosgraph::cloner::Cloner;
//! use cosgraph::{Array, Dictionary, Document, Result};
//!
//! # fn main() -> Result<()> {
//! let source = Document::new();
//! let page = Dictionary::new();
//! page.set("MediaBox", [0, 0, 612, 792].into_iter().collect::<Array>());
//! let page_ref = source.append_page(page)?;
//!
//! let target = Document::new();
//! let mut cloner = Cloner::new(&target);
//! let copy = cloner.clone_reference(&page_ref)?.expect("page resolves");
//! assert_eq!(copy.document_id(), target.id());
//!
//! let copied = copy.resolve()?.and_then(|node| node.as_dictionary()).expect("page copy");
//! assert!(copied.is_name("Type", "Page"));
//! assert!(!copied.contains_key("Parent"));
//! # Ok(())
//! # }
//! ```

pub mod cloner;
pub mod document;
pub mod error;
pub mod objects;
pub mod parser;
pub mod visitor;
pub mod writer;

pub use cloner::{Cloner, Filter};
pub use document::{Document, DocumentOptions, IndirectObject, ObjectLoader};
pub use error::{PdfError, Result};
pub use objects::{
    Array, Dictionary, Name, Node, NodeKind, NodeStatus, ObjectId, PdfDate, PdfString, Reference,
    Stream, StreamDecoder, TypeKey,
};
pub use visitor::Visitor;

/// Current version of cosgraph
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
