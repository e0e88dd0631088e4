//! Object parser
//!
//! Builds nodes from tokens. Stream bodies are not copied when parsing a
//! document's own bytes: they are recorded as pending regions and read on
//! first access.

use super::lexer::{Lexer, Token};
use crate::document::{Document, DocumentInner};
use crate::error::{PdfError, Result};
use crate::objects::{
    Body, Entries, Name, Node, NodeKind, NodeStatus, ObjectId, PdfString, Reference, StreamData,
    Value,
};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::warn;

const MAX_DEPTH: usize = 256;

pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    document: Option<Document>,
    status: NodeStatus,
    lenient: bool,
    /// Stream bodies refer back to the document's bytes instead of being
    /// copied.
    pending_bodies: bool,
    depth: usize,
}

impl<'a> ObjectParser<'a> {
    /// Parser not bound to any document. References come out detached.
    pub fn new(data: &'a [u8], position: usize) -> Self {
        Self {
            lexer: Lexer::at(data, position),
            document: None,
            status: NodeStatus::default(),
            lenient: false,
            pending_bodies: false,
            depth: 0,
        }
    }

    /// Parser over the backing bytes of `document`.
    pub fn bound(data: &'a [u8], position: usize, document: &Document) -> Self {
        let options = document.options();
        let mut status = NodeStatus::ORIGINAL;
        if options.track_changes {
            status |= NodeStatus::UPDATEABLE;
        }
        Self {
            lexer: Lexer::at(data, position),
            document: Some(document.clone()),
            status,
            lenient: options.lenient,
            pending_bodies: true,
            depth: 0,
        }
    }

    /// Parser over a buffer that belongs to `document` but is not its
    /// backing bytes (decoded object-stream data).
    pub fn embedded(data: &'a [u8], position: usize, document: &Document) -> Self {
        Self {
            pending_bodies: false,
            ..Self::bound(data, position, document)
        }
    }

    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    fn node(&self, value: Value) -> Node {
        Node::with_status(value, self.status)
    }

    fn reference(&self, id: ObjectId) -> Reference {
        match &self.document {
            Some(document) => Reference::new(id, document),
            None => Reference::detached(id),
        }
    }

    fn error(&self, message: impl Into<String>) -> PdfError {
        PdfError::parse(self.lexer.position(), message)
    }

    /// Parses `n g obj <object> endobj` and checks the header against `id`.
    pub fn parse_indirect(&mut self, id: ObjectId) -> Result<Node> {
        let (found, node) = self.parse_indirect_any()?;
        if found != id {
            if self.lenient {
                warn!("Expected object {}, found header {} (continuing)", id, found);
            } else {
                return Err(PdfError::structural(format!(
                    "expected object {id}, found header {found}"
                )));
            }
        }
        Ok(node)
    }

    /// Parses `n g obj <object> endobj`, returning the header's id.
    pub fn parse_indirect_any(&mut self) -> Result<(ObjectId, Node)> {
        let number = match self.lexer.next_significant()? {
            Token::Integer(n) => u32::try_from(n)
                .map_err(|_| self.error(format!("Object number {n} is out of range")))?,
            other => return Err(self.error(format!("Expected object number, found {other:?}"))),
        };
        let generation = match self.lexer.next_significant()? {
            Token::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g as u16,
            other => return Err(self.error(format!("Expected generation, found {other:?}"))),
        };
        match self.lexer.next_significant()? {
            Token::Obj => {}
            other => return Err(self.error(format!("Expected 'obj', found {other:?}"))),
        }

        let node = self.parse_object()?;

        match self.lexer.next_significant()? {
            Token::EndObj => {}
            other if self.lenient => {
                warn!("Missing endobj after object {} {} (found {:?})", number, generation, other);
            }
            other => return Err(self.error(format!("Expected 'endobj', found {other:?}"))),
        }
        Ok((ObjectId::new(number, generation), node))
    }

    pub fn parse_object(&mut self) -> Result<Node> {
        let token = self.lexer.next_significant()?;
        self.parse_from(token)
    }

    fn parse_from(&mut self, token: Token) -> Result<Node> {
        match token {
            Token::Null => Ok(self.node(Value::Null)),
            Token::Boolean(b) => Ok(self.node(Value::Boolean(b))),
            Token::Integer(n) => self.parse_integer_or_reference(n),
            Token::Real(r) => Ok(self.node(Value::Real(r))),
            Token::String(bytes) => Ok(self.node(Value::String(PdfString::new(bytes)))),
            Token::HexString(bytes) => Ok(self.node(Value::String(PdfString::hex(bytes)))),
            Token::Name(name) => Ok(self.node(Value::Name(Name::new(name)))),
            Token::ArrayStart => self.nested(Self::parse_array),
            Token::DictStart => self.nested(Self::parse_dictionary_or_stream),
            other => Err(self.error(format!("Unexpected token: {other:?}"))),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<Node>) -> Result<Node> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("Objects nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// `n g R` is a reference; anything else leaves `n` an integer.
    fn parse_integer_or_reference(&mut self, number: i64) -> Result<Node> {
        let second = self.lexer.next_token()?;
        if let Token::Integer(generation) = second {
            let third = self.lexer.next_token()?;
            if let (Token::R, Ok(number), Ok(generation)) =
                (&third, u32::try_from(number), u16::try_from(generation))
            {
                let id = ObjectId::new(number, generation);
                return Ok(self.node(Value::Reference(self.reference(id))));
            }
            self.lexer.push_token(third);
        }
        self.lexer.push_token(second);
        Ok(self.node(Value::Integer(number)))
    }

    fn parse_array(&mut self) -> Result<Node> {
        let mut items = Vec::new();
        loop {
            match self.lexer.next_significant()? {
                Token::ArrayEnd => break,
                Token::Eof => return Err(self.error("Unterminated array")),
                token => items.push(self.parse_from(token)?),
            }
        }
        Ok(self.node(Value::Array(items)))
    }

    fn parse_dictionary_or_stream(&mut self) -> Result<Node> {
        let mut entries = Entries::new();
        loop {
            match self.lexer.next_significant()? {
                Token::DictEnd => break,
                Token::Name(key) => {
                    let value = match self.lexer.next_significant()? {
                        Token::DictEnd if self.lenient => {
                            warn!("Dictionary key /{} has no value", key);
                            entries.insert(Name::new(key), self.node(Value::Null));
                            break;
                        }
                        token => self.parse_from(token)?,
                    };
                    entries.insert(Name::new(key), value);
                }
                Token::Eof => return Err(self.error("Unterminated dictionary")),
                other => {
                    return Err(self.error(format!("Expected dictionary key, found {other:?}")))
                }
            }
        }

        if self.lexer.peek_token()? == Token::Stream {
            self.lexer.next_token()?;
            return self.parse_stream(entries);
        }
        Ok(self.node(Value::Dictionary(entries)))
    }

    fn parse_stream(&mut self, entries: Entries) -> Result<Node> {
        self.lexer.skip_stream_eol();
        let start = self.lexer.position();
        let data = self.lexer.data();

        let declared = self.declared_length(&entries)?;
        let length = match declared {
            Some(length) if self.endstream_at(start.saturating_add(length)) => length,
            _ if self.lenient => {
                let found = self.search_endstream(start)?;
                warn!(
                    "Stream length {:?} is wrong, using {} found by scanning",
                    declared, found
                );
                found
            }
            Some(length) => {
                return Err(self.error(format!(
                    "Stream length {length} does not end at 'endstream'"
                )))
            }
            None => return Err(self.error("Stream has no usable /Length")),
        };

        self.lexer.set_position(start + length);
        match self.lexer.next_significant()? {
            Token::EndStream => {}
            other => return Err(self.error(format!("Expected 'endstream', found {other:?}"))),
        }

        let body = if let Some(path) = external_file(&entries) {
            Body::External(path)
        } else if self.pending_bodies {
            Body::Pending {
                offset: start as u64,
                length,
                source: self.source(),
            }
        } else {
            Body::Local(Arc::new(data[start..start + length].to_vec()))
        };
        Ok(self.node(Value::Stream(StreamData::new(entries, body))))
    }

    fn source(&self) -> Weak<DocumentInner> {
        self.document
            .as_ref()
            .map(|document| Arc::downgrade(&document.0))
            .unwrap_or_default()
    }

    /// `/Length`, following an indirect reference through the document.
    fn declared_length(&self, entries: &Entries) -> Result<Option<usize>> {
        let Some(length) = entries.get("Length") else {
            return Ok(None);
        };
        let resolved = match length.kind() {
            NodeKind::Reference => length.resolve()?,
            _ => Some(length.clone()),
        };
        Ok(resolved
            .and_then(|node| node.as_integer())
            .and_then(|n| usize::try_from(n).ok()))
    }

    fn endstream_at(&self, position: usize) -> bool {
        let data = self.lexer.data();
        let mut position = position;
        while data
            .get(position)
            .is_some_and(|ch| matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0'))
        {
            position += 1;
        }
        data.get(position..)
            .is_some_and(|rest| rest.starts_with(b"endstream"))
    }

    fn search_endstream(&self, start: usize) -> Result<usize> {
        let data = self.lexer.data();
        let found = data
            .get(start..)
            .and_then(|rest| rest.windows(9).position(|window| window == b"endstream"))
            .ok_or_else(|| self.error("Stream is not terminated by 'endstream'"))?;

        let mut length = found;
        if length > 0 && data[start + length - 1] == b'\n' {
            length -= 1;
        }
        if length > 0 && data[start + length - 1] == b'\r' {
            length -= 1;
        }
        Ok(length)
    }
}

/// External file named by a stream's `/F` entry (string or file
/// specification dictionary).
fn external_file(entries: &Entries) -> Option<PathBuf> {
    let file = entries.get("F")?;
    let name = match file.kind() {
        NodeKind::String => file.as_string(),
        NodeKind::Dictionary => file.as_dictionary().and_then(|dict| {
            dict.get("UF")
                .or_else(|| dict.get("F"))
                .and_then(|n| n.as_string())
        }),
        _ => None,
    }?;
    Some(PathBuf::from(name.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Dictionary;

    fn parse(input: &[u8]) -> Node {
        ObjectParser::new(input, 0).parse_object().unwrap()
    }

    #[test]
    fn test_parse_atoms() {
        assert!(parse(b"null").is_null());
        assert_eq!(parse(b"true").as_bool(), Some(true));
        assert_eq!(parse(b"-17").as_integer(), Some(-17));
        assert_eq!(parse(b"2.5").as_real(), Some(2.5));
        assert_eq!(parse(b"/Page").as_name(), Some(Name::new("Page")));
        assert!(parse(b"<41>").as_string().unwrap().is_hex());
    }

    #[test]
    fn test_parse_reference_detached() {
        let node = parse(b"12 0 R");
        let reference = node.as_reference().unwrap();
        assert_eq!(reference.number(), 12);
        assert_eq!(reference.document_id(), 0);
    }

    #[test]
    fn test_parse_integers_not_reference() {
        let array = parse(b"[1 2 3]").as_array().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.get_raw(2).unwrap().as_integer(), Some(3));
    }

    #[test]
    fn test_parse_dictionary_keeps_order_and_parents() {
        let node = parse(b"<< /Type /Page /Kids [4 0 R 5 0 R] /Count 2 >>");
        let dict = node.as_dictionary().unwrap();
        let keys: Vec<String> = dict.keys().iter().map(|k| k.as_str().to_string()).collect();
        assert_eq!(keys, vec!["Type", "Kids", "Count"]);

        let kids = dict.get_raw("Kids").unwrap();
        assert!(Node::ptr_eq(&kids.parent().unwrap(), &node));
        assert_eq!(kids.children().len(), 2);
    }

    #[test]
    fn test_parse_stream_detached_copies_body() {
        let node = parse(b"<< /Length 5 >>\nstream\nHello\nendstream");
        let stream = node.as_stream().unwrap();
        assert_eq!(stream.raw_data().unwrap().as_slice(), b"Hello");
    }

    #[test]
    fn test_parse_stream_wrong_length_strict_fails() {
        let mut parser = ObjectParser::new(b"<< /Length 2 >>\nstream\nHello\nendstream", 0);
        assert!(parser.parse_object().is_err());
    }

    #[test]
    fn test_parse_stream_wrong_length_lenient_scans() {
        let mut parser =
            ObjectParser::new(b"<< /Length 2 >>\nstream\nHello\nendstream", 0).with_lenient(true);
        let node = parser.parse_object().unwrap();
        assert_eq!(node.as_stream().unwrap().raw_data().unwrap().as_slice(), b"Hello");
    }

    #[test]
    fn test_parse_external_stream() {
        let node = parse(b"<< /Length 0 /F (data.bin) >>\nstream\n\nendstream");
        let stream = node.as_stream().unwrap();
        assert_eq!(stream.external_file(), Some(PathBuf::from("data.bin")));
    }

    #[test]
    fn test_parse_indirect_header() {
        let mut parser = ObjectParser::new(b"3 0 obj\n<< /A 1 >>\nendobj", 0);
        let node = parser.parse_indirect(ObjectId::new(3, 0)).unwrap();
        assert_eq!(Dictionary::from_node(node).get_integer("A"), Some(1));
    }

    #[test]
    fn test_out_of_range_numbers_are_not_truncated() {
        assert_eq!(parse(b"4294967296 0 R").as_integer(), Some(4294967296));
        assert_eq!(parse(b"1 65536 R").as_integer(), Some(1));

        let mut parser = ObjectParser::new(b"4294967299 0 obj\n1\nendobj", 0);
        assert!(matches!(
            parser.parse_indirect_any(),
            Err(PdfError::ParseError { .. })
        ));
    }

    #[test]
    fn test_parse_indirect_header_mismatch() {
        let mut parser = ObjectParser::new(b"4 0 obj\n1\nendobj", 0);
        assert!(matches!(
            parser.parse_indirect(ObjectId::new(3, 0)),
            Err(PdfError::StructuralViolation(_))
        ));
    }

    #[test]
    fn test_parse_missing_endobj_lenient() {
        let mut parser = ObjectParser::new(b"3 0 obj\n1\n4 0 obj", 0).with_lenient(true);
        assert_eq!(
            parser.parse_indirect(ObjectId::new(3, 0)).unwrap().as_integer(),
            Some(1)
        );
    }
}
