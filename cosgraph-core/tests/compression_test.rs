//! Moving objects into and out of object streams

mod common;

use common::compressed_pdf;
use cosgraph::document::{EntryUsage, MAX_GENERATION};
use cosgraph::{Dictionary, Document, Name, Node, ObjectId, PdfError, Stream};

fn object_with_name(doc: &Document, name: &str) -> u32 {
    let dict = Dictionary::new();
    dict.set("Name", Name::new(name));
    doc.add_object(dict).number()
}

#[test]
fn test_compress_and_uncompress_round_trip() {
    let doc = Document::new();
    let container = doc.create_object_stream().number();
    let first = object_with_name(&doc, "First");
    let second = object_with_name(&doc, "Second");

    doc.compress_object(first, container).unwrap();
    doc.compress_object(second, container).unwrap();

    let entry = doc.indirect(second).unwrap().entry();
    assert_eq!(entry.usage, EntryUsage::InUseCompressed);
    assert_eq!((entry.stream_number, entry.stream_index), (container, 1));
    assert_eq!(doc.table().members(container), vec![first, second]);

    let data = doc.object(ObjectId::new(first, 0)).unwrap().unwrap();
    assert!(data.as_dictionary().unwrap().is_name("Name", "First"));

    doc.uncompress_object(first).unwrap();
    let entry = doc.indirect(first).unwrap().entry();
    assert_eq!(entry.usage, EntryUsage::InUse);
    assert_eq!(doc.table().members(container), vec![second]);
    assert_eq!(doc.indirect(second).unwrap().entry().stream_index, 1);

    let data = doc.object(ObjectId::new(first, 0)).unwrap().unwrap();
    assert!(data.as_dictionary().unwrap().is_name("Name", "First"));
}

#[test]
fn test_uncompress_loaded_member_extracts_it_first() {
    let doc = Document::load(compressed_pdf()).unwrap();
    assert!(!doc.indirect(4).unwrap().is_loaded());

    doc.uncompress_object(4).unwrap();

    let slot = doc.indirect(4).unwrap();
    assert!(slot.is_loaded());
    assert_eq!(slot.entry().usage, EntryUsage::InUse);
    let page = slot.loaded().unwrap().as_dictionary().unwrap();
    assert!(page.is_name("Type", "Page"));
    assert!(doc.table().is_modified(4));
}

#[test]
fn test_deleting_object_stream_releases_members() {
    let doc = Document::load(compressed_pdf()).unwrap();

    doc.delete_object(2).unwrap();

    assert!(doc.indirect(2).unwrap().entry().is_free());
    assert_eq!(doc.indirect(2).unwrap().generation(), 1);
    assert!(doc.table().members(2).is_empty());
    for member in [3, 4] {
        let slot = doc.indirect(member).unwrap();
        assert_eq!(slot.entry().usage, EntryUsage::InUse);
        assert!(slot.is_loaded());
    }
    assert_eq!(doc.pages().len(), 1);
}

#[test]
fn test_ineligible_objects_are_rejected() {
    let doc = Document::new();
    let container = doc.create_object_stream().number();
    let plain = object_with_name(&doc, "Plain");
    let stream = doc.add_object(Stream::new(b"data".to_vec())).number();
    let not_container = object_with_name(&doc, "NotAContainer");

    let structural = |result: cosgraph::Result<()>| {
        matches!(result, Err(PdfError::StructuralViolation(_)))
    };

    assert!(structural(doc.compress_object(container, container)));
    assert!(structural(doc.compress_object(stream, container)));
    assert!(structural(doc.compress_object(plain, not_container)));
    assert!(structural(doc.compress_object(plain, 9999)));

    doc.compress_object(plain, container).unwrap();
    assert!(structural(doc.compress_object(plain, container)));

    let freed = object_with_name(&doc, "Freed");
    doc.delete_object(freed).unwrap();
    assert!(structural(doc.compress_object(freed, container)));

    doc.reuse_object(freed, Node::integer(1)).unwrap();
    assert_eq!(doc.indirect(freed).unwrap().generation(), 1);
    assert!(structural(doc.compress_object(freed, container)));

    assert!(structural(doc.uncompress_object(not_container)));
}

#[test]
fn test_deleted_slot_is_reused_with_next_generation() {
    let doc = Document::new();
    let number = object_with_name(&doc, "Old");

    doc.delete_object(number).unwrap();
    assert!(doc.object(ObjectId::new(number, 0)).unwrap().is_none());

    let reference = doc.reuse_object(number, Name::new("New")).unwrap();
    assert_eq!(reference.generation(), 1);
    assert_eq!(
        reference.resolve().unwrap().unwrap().as_name(),
        Some(Name::new("New"))
    );
    assert!(matches!(
        doc.reuse_object(number, Node::null()),
        Err(PdfError::StructuralViolation(_))
    ));
}

#[test]
fn test_exhausted_generation_cannot_be_reused() {
    let doc = Document::new();
    let number = object_with_name(&doc, "Churn");

    for _ in 1..MAX_GENERATION {
        doc.delete_object(number).unwrap();
        doc.reuse_object(number, Node::null()).unwrap();
    }
    assert_eq!(doc.indirect(number).unwrap().generation(), MAX_GENERATION - 1);

    doc.delete_object(number).unwrap();
    assert_eq!(doc.indirect(number).unwrap().generation(), MAX_GENERATION);
    assert!(matches!(
        doc.reuse_object(number, Node::null()),
        Err(PdfError::UnreusableSlot { .. })
    ));
}
