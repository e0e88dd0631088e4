use super::xref::XRefEntry;
use super::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Node, ObjectId};
use crate::parser::ObjectParser;
use std::sync::Arc;

/// Source of on-file object data for a document.
pub trait ObjectLoader: Send + Sync {
    /// Parses the standalone object `id` described by `entry`.
    fn load(&self, document: &Document, id: ObjectId, entry: &XRefEntry) -> Result<Node>;

    /// Reads `length` bytes at `offset` (stream bodies).
    fn read_bytes(&self, offset: u64, length: usize) -> Result<Vec<u8>>;
}

/// Loader over an in-memory copy of the file.
#[derive(Debug, Clone)]
pub struct BufferLoader {
    data: Arc<[u8]>,
}

impl BufferLoader {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ObjectLoader for BufferLoader {
    fn load(&self, document: &Document, id: ObjectId, entry: &XRefEntry) -> Result<Node> {
        let offset = usize::try_from(entry.offset).unwrap_or(usize::MAX);
        if offset >= self.data.len() {
            return Err(PdfError::structural(format!(
                "object {} offset {} is past the end of the data ({} bytes)",
                id,
                entry.offset,
                self.data.len()
            )));
        }
        let mut parser = ObjectParser::bound(&self.data, offset, document);
        parser.parse_indirect(id)
    }

    fn read_bytes(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.checked_add(length).unwrap_or(usize::MAX);
        self.data
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                PdfError::structural(format!(
                    "byte range {}..{} is past the end of the data ({} bytes)",
                    start,
                    end,
                    self.data.len()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bytes_in_range() {
        let loader = BufferLoader::new(b"0123456789".to_vec());
        assert_eq!(loader.read_bytes(2, 3).unwrap(), b"234");
    }

    #[test]
    fn test_read_bytes_out_of_range() {
        let loader = BufferLoader::new(b"0123".to_vec());
        assert!(matches!(
            loader.read_bytes(2, 10),
            Err(PdfError::StructuralViolation(_))
        ));
    }
}
