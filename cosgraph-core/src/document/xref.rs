//! Cross-reference entry definitions

/// Highest generation number. A free slot that reached it cannot be reused.
pub const MAX_GENERATION: u16 = 65535;

/// How a slot's data is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryUsage {
    /// Type 0: free slot
    Free,
    /// Type 1: standalone object at a byte offset
    InUse,
    /// Type 2: member of an object stream
    InUseCompressed,
}

impl EntryUsage {
    /// Parse the type field of an xref stream row
    pub fn from_value(value: u64) -> Option<Self> {
        match value {
            0 => Some(EntryUsage::Free),
            1 => Some(EntryUsage::InUse),
            2 => Some(EntryUsage::InUseCompressed),
            _ => None,
        }
    }

    pub fn to_value(self) -> u8 {
        match self {
            EntryUsage::Free => 0,
            EntryUsage::InUse => 1,
            EntryUsage::InUseCompressed => 2,
        }
    }
}

/// Cross-reference entry of one slot.
///
/// `offset` is only meaningful for `InUse` entries; an offset of 0 means the
/// object has no on-file representation yet. `stream_number` and
/// `stream_index` are only meaningful for `InUseCompressed` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    pub offset: u64,
    pub generation: u16,
    pub usage: EntryUsage,
    pub stream_number: u32,
    pub stream_index: u32,
}

impl XRefEntry {
    pub fn free(generation: u16) -> Self {
        Self {
            offset: 0,
            generation,
            usage: EntryUsage::Free,
            stream_number: 0,
            stream_index: 0,
        }
    }

    pub fn in_use(offset: u64, generation: u16) -> Self {
        Self {
            offset,
            generation,
            usage: EntryUsage::InUse,
            stream_number: 0,
            stream_index: 0,
        }
    }

    pub fn compressed(stream_number: u32, stream_index: u32) -> Self {
        Self {
            offset: 0,
            generation: 0,
            usage: EntryUsage::InUseCompressed,
            stream_number,
            stream_index,
        }
    }

    pub fn is_free(&self) -> bool {
        self.usage == EntryUsage::Free
    }

    pub fn is_compressed(&self) -> bool {
        self.usage == EntryUsage::InUseCompressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_from_value() {
        assert_eq!(EntryUsage::from_value(0), Some(EntryUsage::Free));
        assert_eq!(EntryUsage::from_value(1), Some(EntryUsage::InUse));
        assert_eq!(EntryUsage::from_value(2), Some(EntryUsage::InUseCompressed));
        assert_eq!(EntryUsage::from_value(7), None);
    }

    #[test]
    fn test_usage_round_trip_value() {
        for usage in [EntryUsage::Free, EntryUsage::InUse, EntryUsage::InUseCompressed] {
            assert_eq!(EntryUsage::from_value(usage.to_value() as u64), Some(usage));
        }
    }

    #[test]
    fn test_entry_constructors() {
        let compressed = XRefEntry::compressed(12, 3);
        assert!(compressed.is_compressed());
        assert_eq!(compressed.generation, 0);
        assert_eq!((compressed.stream_number, compressed.stream_index), (12, 3));

        assert!(XRefEntry::free(4).is_free());
        assert_eq!(XRefEntry::in_use(100, 2).offset, 100);
    }
}
