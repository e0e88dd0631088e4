//! Object streams
//!
//! Index over the header of an object stream (`N` pairs of object number
//! and offset, relative to `First`). Members are parsed one at a time, on
//! request.

use super::lexer::{Lexer, Token};
use super::objects::ObjectParser;
use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Node, Stream};
use std::sync::Arc;

#[derive(Debug)]
pub struct ObjectStreamIndex {
    /// Decoded stream data
    data: Arc<Vec<u8>>,
    /// Offset of the first object
    first: usize,
    /// (object number, offset relative to `first`) in stream order
    offsets: Vec<(u32, usize)>,
}

impl ObjectStreamIndex {
    /// Reads the header of an object stream
    pub fn parse(stream: &Stream) -> Result<Self> {
        let dict = stream.dictionary();

        let n = dict
            .get_integer("N")
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| PdfError::structural("object stream has no valid /N"))?;
        let first = dict
            .get_integer("First")
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| PdfError::structural("object stream has no valid /First"))?;

        let data = stream.decoded_data()?;
        if first > data.len() {
            return Err(PdfError::structural(format!(
                "object stream /First {} is past the end of its data ({} bytes)",
                first,
                data.len()
            )));
        }

        let mut lexer = Lexer::new(&data[..first]);
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let number = match lexer.next_significant()? {
                Token::Integer(n) => u32::try_from(n).map_err(|_| {
                    PdfError::structural(format!(
                        "object number {n} in object stream header is out of range"
                    ))
                })?,
                other => {
                    return Err(PdfError::structural(format!(
                        "expected object number in object stream header, found {other:?}"
                    )))
                }
            };
            let offset = match lexer.next_significant()? {
                Token::Integer(n) if n >= 0 => n as usize,
                other => {
                    return Err(PdfError::structural(format!(
                        "expected offset in object stream header, found {other:?}"
                    )))
                }
            };
            offsets.push((number, offset));
        }

        Ok(Self {
            data,
            first,
            offsets,
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Object numbers in stream order
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.offsets.iter().map(|(number, _)| *number)
    }

    /// Parses the member at `index`, which must hold object `number`.
    pub fn parse_object(&self, index: u32, number: u32, document: &Document) -> Result<Node> {
        let (found, offset) = self
            .offsets
            .get(index as usize)
            .copied()
            .ok_or_else(|| {
                PdfError::structural(format!(
                    "index {} is out of range for an object stream of {} objects",
                    index,
                    self.offsets.len()
                ))
            })?;
        if found != number {
            return Err(PdfError::structural(format!(
                "object stream entry {index} holds object {found}, expected {number}"
            )));
        }

        let position = self.first + offset;
        if position >= self.data.len() {
            return Err(PdfError::structural(format!(
                "object {number} offset {position} is past the end of its object stream"
            )));
        }
        ObjectParser::embedded(&self.data, position, document).parse_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Dictionary, Name};

    fn object_stream(header: &str, body: &str) -> Stream {
        let dict = Dictionary::new();
        dict.set("Type", Name::new("ObjStm"));
        dict.set("N", 1);
        dict.set("First", header.len());
        Stream::with_dictionary(dict, format!("{header}{body}").into_bytes())
    }

    #[test]
    fn test_parse_header() {
        let index = ObjectStreamIndex::parse(&object_stream("7 0 ", "<< /A 1 >>")).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.object_numbers().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_out_of_range_object_number_is_rejected() {
        let result = ObjectStreamIndex::parse(&object_stream("4294967303 0 ", "1"));
        assert!(matches!(result, Err(PdfError::StructuralViolation(_))));
    }
}
