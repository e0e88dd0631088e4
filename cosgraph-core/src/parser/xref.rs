//! Cross-reference reading
//!
//! Follows `startxref` to the newest section and walks the `/Prev` chain.
//! Sections may be traditional tables or cross-reference streams; hybrid
//! files (`/XRefStm`) are supported. Newer sections win over older ones.

use super::lexer::{Lexer, Token};
use super::objects::ObjectParser;
use crate::document::{DocumentOptions, EntryUsage, XRefEntry};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Node, Stream};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Keys of a cross-reference stream dictionary that describe the stream
/// itself rather than the document.
const XREF_STREAM_KEYS: [&str; 8] = [
    "Type",
    "Length",
    "Filter",
    "DecodeParms",
    "W",
    "Index",
    "DL",
    "F",
];

/// Result of reading the cross-reference data of a file.
#[derive(Debug)]
pub struct XRefData {
    pub entries: BTreeMap<u32, XRefEntry>,
    /// Trailer of the newest section. References in it are detached until
    /// the document is assembled.
    pub trailer: Node,
}

pub fn read_xref(data: &[u8], options: &DocumentOptions) -> Result<XRefData> {
    let mut offset = find_startxref(data)?;
    let mut entries = BTreeMap::new();
    let mut trailer: Option<Dictionary> = None;
    let mut visited = HashSet::new();

    loop {
        if !visited.insert(offset) {
            warn!("Cross-reference /Prev chain loops back to offset {}", offset);
            break;
        }
        let section = read_section(data, offset, options)?;
        debug!(
            "Read cross-reference section at {} ({} entries)",
            offset,
            section.entries.len()
        );
        for (number, entry) in section.entries {
            entries.entry(number).or_insert(entry);
        }

        let prev = section.trailer.get_integer("Prev");
        if trailer.is_none() {
            trailer = Some(section.trailer);
        }
        match prev.and_then(|prev| usize::try_from(prev).ok()) {
            Some(prev) => offset = prev,
            None => break,
        }
    }

    let trailer = trailer.ok_or_else(|| PdfError::InvalidXRef("no trailer found".to_string()))?;
    trailer.remove("Prev");
    trailer.remove("XRefStm");
    Ok(XRefData {
        entries,
        trailer: trailer.into_node(),
    })
}

struct Section {
    entries: Vec<(u32, XRefEntry)>,
    trailer: Dictionary,
}

/// Offset named by the last `startxref` in the final 1024 bytes.
fn find_startxref(data: &[u8]) -> Result<usize> {
    let tail_start = data.len().saturating_sub(1024);
    let tail = &data[tail_start..];
    let keyword = tail
        .windows(9)
        .rposition(|window| window == b"startxref")
        .ok_or_else(|| PdfError::InvalidXRef("startxref not found".to_string()))?;

    let mut lexer = Lexer::at(data, tail_start + keyword + 9);
    match lexer.next_significant()? {
        Token::Integer(offset) if offset >= 0 && (offset as usize) < data.len() => {
            Ok(offset as usize)
        }
        other => Err(PdfError::InvalidXRef(format!(
            "invalid startxref offset: {other:?}"
        ))),
    }
}

fn read_section(data: &[u8], offset: usize, options: &DocumentOptions) -> Result<Section> {
    let mut lexer = Lexer::at(data, offset);
    if lexer.next_significant()? == Token::XRef {
        let mut section = read_table(data, lexer.position(), options)?;
        if let Some(stream_offset) = section
            .trailer
            .get_integer("XRefStm")
            .and_then(|n| usize::try_from(n).ok())
        {
            let hybrid = read_stream(data, stream_offset, options)?;
            section.entries.extend(hybrid.entries);
        }
        Ok(section)
    } else {
        read_stream(data, offset, options)
    }
}

/// Traditional table: subsections of `offset generation n|f` rows, then
/// `trailer << ... >>`.
fn read_table(data: &[u8], position: usize, options: &DocumentOptions) -> Result<Section> {
    let mut lexer = Lexer::at(data, position);
    let mut entries = Vec::new();

    loop {
        match lexer.next_significant()? {
            Token::Integer(start) if start >= 0 => {
                let count = match lexer.next_significant()? {
                    Token::Integer(count) if count >= 0 => count,
                    other => {
                        return Err(PdfError::InvalidXRef(format!(
                            "expected subsection size, found {other:?}"
                        )))
                    }
                };
                for index in 0..count {
                    let number = object_number(start, index)?;
                    entries.push((number, read_table_row(&mut lexer)?));
                }
            }
            Token::Trailer => break,
            other => {
                return Err(PdfError::InvalidXRef(format!(
                    "unexpected token in xref table: {other:?}"
                )))
            }
        }
    }

    let trailer = ObjectParser::new(data, lexer.position())
        .with_lenient(options.lenient)
        .parse_object()?
        .as_dictionary()
        .ok_or_else(|| PdfError::InvalidXRef("trailer is not a dictionary".to_string()))?;
    Ok(Section { entries, trailer })
}

fn read_table_row(lexer: &mut Lexer<'_>) -> Result<XRefEntry> {
    let offset = match lexer.next_significant()? {
        Token::Integer(offset) if offset >= 0 => offset as u64,
        other => {
            return Err(PdfError::InvalidXRef(format!(
                "expected entry offset, found {other:?}"
            )))
        }
    };
    let generation = match lexer.next_significant()? {
        Token::Integer(generation) if (0..=u16::MAX as i64).contains(&generation) => {
            generation as u16
        }
        other => {
            return Err(PdfError::InvalidXRef(format!(
                "expected entry generation, found {other:?}"
            )))
        }
    };
    match lexer.next_significant()? {
        Token::Keyword(kind) if kind == "n" => Ok(XRefEntry::in_use(offset, generation)),
        Token::Keyword(kind) if kind == "f" => Ok(XRefEntry::free(generation)),
        other => Err(PdfError::InvalidXRef(format!(
            "expected entry type 'n' or 'f', found {other:?}"
        ))),
    }
}

/// Cross-reference stream: binary rows described by `/W` and `/Index`.
fn read_stream(data: &[u8], offset: usize, options: &DocumentOptions) -> Result<Section> {
    let (_, node) = ObjectParser::new(data, offset)
        .with_lenient(options.lenient)
        .parse_indirect_any()?;
    let stream = node
        .as_stream()
        .ok_or_else(|| PdfError::InvalidXRef(format!("no xref table or stream at {offset}")))?;
    let dict = stream.dictionary();
    if !dict.is_name("Type", "XRef") {
        return Err(PdfError::InvalidXRef(format!(
            "object at {offset} is not a cross-reference stream"
        )));
    }

    let widths: Vec<usize> = dict
        .get_array("W")
        .map(|w| {
            w.items()
                .iter()
                .filter_map(|n| n.as_integer())
                .filter_map(|n| usize::try_from(n).ok())
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|w| *w > 8) {
        return Err(PdfError::InvalidXRef(format!("invalid /W {widths:?}")));
    }

    let size = dict.get_integer("Size").unwrap_or(0);
    let index: Vec<i64> = match dict.get_array("Index") {
        Some(index) => index.items().iter().filter_map(|n| n.as_integer()).collect(),
        None => vec![0, size],
    };
    if index.len() % 2 != 0 {
        return Err(PdfError::InvalidXRef("odd /Index length".to_string()));
    }

    let rows = decode_stream(&stream, options)?;
    let row_width: usize = widths.iter().sum();
    if row_width == 0 {
        return Err(PdfError::InvalidXRef("zero-width xref rows".to_string()));
    }

    let mut entries = Vec::new();
    let mut cursor = rows.chunks_exact(row_width);
    for range in index.chunks(2) {
        let (start, count) = (range[0], range[1]);
        for i in 0..count.max(0) {
            let Some(row) = cursor.next() else {
                return Err(PdfError::InvalidXRef(
                    "cross-reference stream is shorter than its /Index".to_string(),
                ));
            };
            let number = object_number(start, i)?;
            if let Some(entry) = decode_row(row, &widths)? {
                entries.push((number, entry));
            }
        }
    }

    let trailer: Dictionary = dict
        .entries()
        .into_iter()
        .filter(|(key, _)| !XREF_STREAM_KEYS.contains(&key.as_str()))
        .collect();
    Ok(Section { entries, trailer })
}

fn decode_stream(stream: &Stream, options: &DocumentOptions) -> Result<Vec<u8>> {
    let decoded = match &options.decoder {
        Some(decoder) => stream.decoded_data_with(decoder.as_ref())?,
        None => stream.decoded_data()?,
    };
    Ok(decoded.to_vec())
}

/// Number of the `index`-th object of a subsection starting at `start`.
fn object_number(start: i64, index: i64) -> Result<u32> {
    start
        .checked_add(index)
        .and_then(|number| u32::try_from(number).ok())
        .ok_or_else(|| {
            PdfError::InvalidXRef(format!(
                "object number {start} + {index} is out of range"
            ))
        })
}

fn read_field(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |value, byte| (value << 8) | *byte as u64)
}

/// `None` for rows of an unknown type.
fn decode_row(row: &[u8], widths: &[usize]) -> Result<Option<XRefEntry>> {
    let (type_field, rest) = row.split_at(widths[0]);
    let (second, third) = rest.split_at(widths[1]);
    // A zero-width type field means type 1
    let usage = if widths[0] == 0 {
        EntryUsage::InUse
    } else {
        match EntryUsage::from_value(read_field(type_field)) {
            Some(usage) => usage,
            None => return Ok(None),
        }
    };
    let second = read_field(second);
    let third = read_field(third);

    let out_of_range =
        |field: u64| PdfError::InvalidXRef(format!("xref stream field {field} is out of range"));
    let generation = |field: u64| u16::try_from(field).map_err(|_| out_of_range(field));
    let entry = match usage {
        EntryUsage::Free => XRefEntry::free(generation(third)?),
        EntryUsage::InUse => XRefEntry::in_use(second, generation(third)?),
        EntryUsage::InUseCompressed => XRefEntry::compressed(
            u32::try_from(second).map_err(|_| out_of_range(second))?,
            u32::try_from(third).map_err(|_| out_of_range(third))?,
        ),
    };
    Ok(Some(entry))
}
