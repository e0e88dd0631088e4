//! Byte-level parsing: tokens, objects, cross-reference data and object
//! streams

mod lexer;
mod object_stream;
mod objects;
mod xref;

pub use lexer::{Lexer, Token};
pub use object_stream::ObjectStreamIndex;
pub use objects::ObjectParser;
pub use xref::{read_xref, XRefData};
