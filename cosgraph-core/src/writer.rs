//! Serialization of nodes and indirect objects in PDF syntax
//!
//! Virtual entries are never written, except that a Virtual array slot
//! before a concrete item is written as `null`. Stream `Length` is always taken from
//! the body actually written; external bodies are written as a dictionary
//! with `Length 0` and no data.

use crate::document::IndirectObject;
use crate::error::{PdfError, Result};
use crate::objects::{written_items, Body, Name, Node, NodeKind, PdfString, Stream};
use crate::visitor::Visitor;
use std::io::Write;

/// Writes every node it visits to `out`.
pub struct ObjectWriter<'w> {
    out: &'w mut dyn Write,
}

impl<'w> ObjectWriter<'w> {
    pub fn new(out: &'w mut dyn Write) -> Self {
        Self { out }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.out.write_all(data)?;
        Ok(())
    }

    fn write_entries(&mut self, entries: &[(Name, Node)], length: Option<usize>) -> Result<()> {
        self.write_bytes(b"<<")?;
        for (key, value) in entries {
            if value.is_virtual() {
                continue;
            }
            self.write_bytes(b"\n")?;
            write_name(self.out, key)?;
            self.write_bytes(b" ")?;
            match length {
                Some(length) if key == "Length" => {
                    self.write_bytes(length.to_string().as_bytes())?
                }
                _ => {
                    self.visit(value)?;
                }
            }
        }
        if let Some(length) = length {
            if !entries.iter().any(|(key, _)| key == "Length") {
                self.write_bytes(b"\n/Length ")?;
                self.write_bytes(length.to_string().as_bytes())?;
            }
        }
        self.write_bytes(b"\n>>")
    }
}

impl Visitor for ObjectWriter<'_> {
    fn visit_atom(&mut self, node: &Node) -> Result<Node> {
        match node.kind() {
            NodeKind::Null => self.write_bytes(b"null")?,
            NodeKind::Boolean => {
                let value = node.as_bool().unwrap_or(false);
                self.write_bytes(if value { b"true" } else { b"false" })?
            }
            NodeKind::Integer => {
                let value = node.as_integer().unwrap_or(0);
                self.write_bytes(value.to_string().as_bytes())?
            }
            NodeKind::Real => {
                let value = node.as_real().unwrap_or(0.0);
                self.write_bytes(format_real(value).as_bytes())?
            }
            NodeKind::Name => {
                if let Some(name) = node.as_name() {
                    write_name(self.out, &name)?;
                }
            }
            // Dates come back as their PDF string form
            NodeKind::String | NodeKind::Date => {
                if let Some(string) = node.as_string() {
                    write_string(self.out, &string)?;
                }
            }
            _ => {}
        }
        Ok(node.clone())
    }

    fn visit_array(&mut self, node: &Node) -> Result<Node> {
        self.write_bytes(b"[")?;
        let mut first = true;
        for item in written_items(&node.children()) {
            if !first {
                self.write_bytes(b" ")?;
            }
            first = false;
            self.visit(&item)?;
        }
        self.write_bytes(b"]")?;
        Ok(node.clone())
    }

    fn visit_dictionary(&mut self, node: &Node) -> Result<Node> {
        let entries = node.with_entries(|entries| {
            entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Vec<_>>()
        });
        self.write_entries(&entries.unwrap_or_default(), None)?;
        Ok(node.clone())
    }

    fn visit_stream(&mut self, node: &Node) -> Result<Node> {
        let stream = Stream::from_node(node.clone());
        let entries = stream.dictionary().entries();
        match stream.body() {
            Some(Body::External(_)) => {
                self.write_entries(&entries, Some(0))?;
                self.write_bytes(b"\nstream\nendstream")?;
            }
            _ => {
                let data = stream.raw_data()?;
                self.write_entries(&entries, Some(data.len()))?;
                self.write_bytes(b"\nstream\n")?;
                self.write_bytes(&data)?;
                self.write_bytes(b"\nendstream")?;
            }
        }
        Ok(node.clone())
    }

    fn visit_reference(&mut self, node: &Node) -> Result<Node> {
        if let Some(reference) = node.as_reference() {
            let text = format!("{} {} R", reference.number(), reference.generation());
            self.write_bytes(text.as_bytes())?;
        }
        Ok(node.clone())
    }
}

impl Node {
    /// Writes this node in PDF syntax.
    pub fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        ObjectWriter::new(out).visit(self)?;
        Ok(())
    }

    /// This node in PDF syntax.
    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

impl IndirectObject {
    /// Writes `n g obj ... endobj`. Free or empty slots cannot be written.
    pub fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        if self.entry().is_free() {
            return Err(PdfError::structural(format!(
                "object {} is free and cannot be written",
                self.number()
            )));
        }
        let node = self.require()?;
        let id = self.id();
        out.write_all(format!("{} {} obj\n", id.number(), id.generation()).as_bytes())?;
        node.write_to(out)?;
        out.write_all(b"\nendobj\n")?;
        Ok(())
    }
}

fn format_real(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Writes `/Name`, escaping `#`, delimiters and bytes outside the printable
/// ASCII range as `#xx`.
pub fn write_name(out: &mut dyn Write, name: &Name) -> Result<()> {
    let mut encoded = Vec::with_capacity(name.as_str().len() + 1);
    encoded.push(b'/');
    for &byte in name.as_str().as_bytes() {
        if byte == b'#' || is_delimiter(byte) || !(0x21..=0x7e).contains(&byte) {
            encoded.extend_from_slice(format!("#{byte:02X}").as_bytes());
        } else {
            encoded.push(byte);
        }
    }
    out.write_all(&encoded)?;
    Ok(())
}

/// Writes a string as `<hex>` when it was hex-encoded, otherwise as an
/// escaped literal.
pub fn write_string(out: &mut dyn Write, string: &PdfString) -> Result<()> {
    let bytes = string.as_bytes();
    let mut encoded = Vec::with_capacity(bytes.len() + 2);
    if string.is_hex() {
        encoded.push(b'<');
        for byte in bytes {
            encoded.extend_from_slice(format!("{byte:02X}").as_bytes());
        }
        encoded.push(b'>');
    } else {
        encoded.push(b'(');
        for &byte in bytes {
            match byte {
                b'(' | b')' | b'\\' => {
                    encoded.push(b'\\');
                    encoded.push(byte);
                }
                b'\n' => encoded.extend_from_slice(b"\\n"),
                b'\r' => encoded.extend_from_slice(b"\\r"),
                b'\t' => encoded.extend_from_slice(b"\\t"),
                0x08 => encoded.extend_from_slice(b"\\b"),
                0x0c => encoded.extend_from_slice(b"\\f"),
                _ => encoded.push(byte),
            }
        }
        encoded.push(b')');
    }
    out.write_all(&encoded)?;
    Ok(())
}
