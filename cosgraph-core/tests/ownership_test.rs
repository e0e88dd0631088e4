//! Single-owner containment, swapping and change propagation

use cosgraph::{Array, Dictionary, Document, Name, Node, NodeKind, PdfError, TypeKey};
use pretty_assertions::assert_eq;

#[test]
fn test_inserting_owned_node_copies_it() {
    let first = Dictionary::new();
    let second = Dictionary::new();
    let shared = Array::new();
    shared.push(1);

    let stored = first.set("Box", shared.clone());
    assert!(Node::ptr_eq(&stored, shared.node()));

    let copied = second.set("Box", shared.clone());
    assert!(!Node::ptr_eq(&copied, shared.node()));
    assert_eq!(copied, *shared.node());
    assert!(Node::ptr_eq(&shared.node().parent().unwrap(), first.node()));
    assert!(Node::ptr_eq(&copied.parent().unwrap(), second.node()));

    copied.as_array().unwrap().push(2);
    assert_eq!(shared.len(), 1);
}

#[test]
fn test_views_share_one_node() {
    let dict = Dictionary::new();
    let view = dict.node().as_dictionary().unwrap();

    view.set("Count", 3);
    assert_eq!(dict.get_integer("Count"), Some(3));
}

#[test]
fn test_removed_node_can_move_without_copy() {
    let source = Array::new();
    let moving = Dictionary::new();
    source.push(moving.clone());

    let removed = source.remove(0).unwrap();
    assert!(removed.parent().is_none());

    let target = Dictionary::new();
    let stored = target.set("Moved", removed);
    assert!(Node::ptr_eq(&stored, moving.node()));
}

#[test]
fn test_container_cannot_contain_itself() {
    let dict = Dictionary::new();
    dict.set("Name", Name::new("Outer"));

    let stored = dict.set("Self", dict.clone());
    assert!(!Node::ptr_eq(&stored, dict.node()));
    assert_eq!(
        stored.as_dictionary().unwrap().get_name("Name"),
        Some(Name::new("Outer"))
    );
}

#[test]
fn test_indirect_object_cannot_be_inlined_directly() {
    let doc = Document::new();
    let font = Dictionary::new();
    let reference = doc.add_object(font.clone());
    assert!(Node::ptr_eq(
        &reference.resolve().unwrap().unwrap(),
        font.node()
    ));

    let resources = Dictionary::new();
    let stored = resources.set("Font", font.clone());
    assert!(!Node::ptr_eq(&stored, font.node()));
}

#[test]
fn test_swap_keeps_handles_stable() {
    let left = Dictionary::new();
    left.set("Side", Name::new("Left"));
    let right = Dictionary::new();
    right.set("Side", Name::new("Right"));
    let child = Array::new();
    right.set("Child", child.clone());

    left.node().swap(right.node()).unwrap();

    assert!(left.is_name("Side", "Right"));
    assert!(right.is_name("Side", "Left"));
    let moved = left.get_raw("Child").unwrap();
    assert!(Node::ptr_eq(&moved, child.node()));
    assert!(Node::ptr_eq(&moved.parent().unwrap(), left.node()));
    assert!(left.node().is_updated());
}

#[test]
fn test_swap_rejects_mismatched_kinds_and_ancestors() {
    let dict = Dictionary::new();
    let array = Array::new();
    assert!(matches!(
        dict.node().swap(array.node()),
        Err(PdfError::TypeMismatch { .. })
    ));

    let inner = dict.get_or_create_dictionary("Inner");
    assert!(matches!(
        dict.node().swap(inner.node()),
        Err(PdfError::StructuralViolation(_))
    ));
}

#[test]
fn test_get_or_create_is_virtual_until_written() {
    let dict = Dictionary::new();
    let resources = dict.get_or_create_dictionary("Resources");
    assert!(resources.node().is_virtual());
    assert!(!dict.node().is_updated());

    let again = dict.get_or_create("Resources", TypeKey::Dictionary);
    assert!(Node::ptr_eq(&again, resources.node()));

    resources.set("ProcSet", Array::new());
    assert!(!resources.node().is_virtual());
    assert!(dict.node().is_updated());
}

#[test]
fn test_get_or_create_replaces_mismatched_entry() {
    let dict = Dictionary::new();
    dict.set("Kids", 5);

    let kids = dict.get_or_create("Kids", TypeKey::Array);
    assert_eq!(kids.kind(), NodeKind::Array);
    assert_eq!(dict.get_raw("Kids").unwrap().kind(), NodeKind::Array);
}

#[test]
fn test_non_updateable_node_stops_propagation() {
    let frozen: Dictionary = [("Inner", Dictionary::new())].into_iter().collect();
    let inner = frozen.get_dictionary("Inner").unwrap();
    assert!(!frozen.node().is_updated());

    frozen.node().set_updateable(false);
    inner.set("Value", 1);

    assert!(inner.node().is_updated());
    assert!(!frozen.node().is_updated());
}

#[test]
fn test_created_objects_are_not_modified_originals() {
    let doc = Document::new();
    let reference = doc.add_object(Dictionary::new());
    let dict = reference.resolve().unwrap().unwrap().as_dictionary().unwrap();

    dict.set("Changed", true);

    assert!(doc.modified_objects().is_empty());
    assert!(doc
        .new_objects()
        .iter()
        .any(|slot| slot.number() == reference.number()));
}
