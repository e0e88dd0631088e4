//! Tests for Array view functionality

use super::*;
use crate::objects::{Dictionary, Name, NodeKind};

#[test]
fn test_array_new() {
    let array = Array::new();
    assert_eq!(array.len(), 0, "New array should be empty");
    assert!(array.is_empty(), "New array should be empty");
}

#[test]
fn test_array_with_capacity() {
    let array = Array::with_capacity(10);
    assert_eq!(array.len(), 0, "Array with capacity should start empty");
}

#[test]
fn test_array_push_and_get() {
    let array = Array::new();

    array.push(42);
    array.push(true);

    assert_eq!(array.len(), 2, "Array should have two elements after push");
    assert_eq!(array.get(0).and_then(|n| n.as_integer()), Some(42));
    assert_eq!(array.get(1).and_then(|n| n.as_bool()), Some(true));
    assert!(array.get(2).is_none(), "Out of range get should be None");
}

#[test]
fn test_array_push_sets_parent_and_updates() {
    let array = Array::new();
    let child = array.push(1);

    assert!(
        Node::ptr_eq(&child.parent().unwrap(), array.node()),
        "Pushed node should be parented to the array"
    );
    assert!(array.node().is_updated(), "Push should mark the array updated");
}

#[test]
fn test_array_pop() {
    let array = Array::new();
    assert!(array.pop().is_none(), "Pop on empty array should return None");

    array.push(1);
    let popped = array.pop().unwrap();
    assert_eq!(popped.as_integer(), Some(1));
    assert!(popped.parent().is_none(), "Popped node should be detached");
    assert!(array.is_empty());
}

#[test]
fn test_array_insert() {
    let array = Array::new();
    array.push(1);
    array.push(3);

    array.insert(1, 2).unwrap();
    let values: Vec<i64> = array.items().iter().filter_map(|n| n.as_integer()).collect();
    assert_eq!(values, vec![1, 2, 3], "Insert should place element at index");

    array.insert(3, 4).unwrap();
    assert_eq!(array.len(), 4, "Insert at len should append");
}

#[test]
fn test_array_insert_out_of_range() {
    let array = Array::new();
    let result = array.insert(2, 1);
    assert!(matches!(
        result,
        Err(PdfError::IndexOutOfRange { index: 2, len: 0 })
    ));
}

#[test]
fn test_array_set_replaces_and_detaches() {
    let array = Array::new();
    let old = array.push(1);

    let new = array.set(0, "two").unwrap();

    assert!(old.parent().is_none(), "Replaced node should be detached");
    assert!(Node::ptr_eq(&array.get_raw(0).unwrap(), &new));
    assert!(array.set(5, 1).is_err(), "Set past the end should fail");
}

#[test]
fn test_array_remove() {
    let array: Array = vec![Node::from(1), Node::from(2), Node::from(3)].into();

    let removed = array.remove(1).unwrap();
    assert_eq!(removed.as_integer(), Some(2));
    assert_eq!(array.len(), 2);
    assert!(array.remove(10).is_none(), "Remove out of range is None");
}

#[test]
fn test_array_clear() {
    let array: Array = [1, 2, 3].into_iter().collect();
    let first = array.get_raw(0).unwrap();

    array.clear();

    assert!(array.is_empty(), "Array should be empty after clear");
    assert!(first.parent().is_none(), "Cleared nodes should be detached");
}

#[test]
fn test_array_views_share_content() {
    let array = Array::new();
    let other = array.node().as_array().unwrap();

    other.push(7);

    assert_eq!(array.len(), 1, "Both views should see the same node");
}

#[test]
fn test_array_index_of() {
    let array = Array::new();
    array.push(1);
    let second = array.push(Name::new("X"));

    assert_eq!(array.index_of(&second), Some(1));
    assert_eq!(array.index_of(&Node::name("X")), Some(1));
    assert_eq!(array.index_of(&Node::name("Y")), None);
}

#[test]
fn test_array_get_typed() {
    let array = Array::new();
    array.push(1);
    array.push(2.5);

    assert!(array.get_typed(0, TypeKey::Number).is_some());
    assert!(array.get_typed(1, TypeKey::Number).is_some());
    assert!(array.get_typed(0, TypeKey::Name).is_none());
}

#[test]
fn test_array_get_or_create_existing() {
    let array = Array::new();
    let dict = array.push(Dictionary::new());

    let found = array.get_or_create(0, TypeKey::Dictionary);

    assert!(Node::ptr_eq(&found, &dict));
    assert!(!found.is_virtual());
}

#[test]
fn test_array_get_or_create_pads_with_virtual_nulls() {
    let array = Array::new();

    let created = array.get_or_create(2, TypeKey::Array);

    assert_eq!(array.len(), 3, "Array should be padded up to the index");
    assert!(created.is_virtual());
    assert_eq!(created.kind(), NodeKind::Array);
    assert!(array.get_raw(0).unwrap().is_virtual());
    assert!(array.get_raw(0).unwrap().is_null());
    assert!(!array.node().is_updated(), "Placeholders are not modifications");
}

#[test]
fn test_array_get_or_create_replaces_mismatch() {
    let array = Array::new();
    array.push(1);

    let created = array.get_or_create(0, TypeKey::Dictionary);

    assert_eq!(created.kind(), NodeKind::Dictionary);
    assert_eq!(array.len(), 1);
    assert!(array.node().is_updated());
}

#[test]
fn test_virtual_element_becomes_concrete_on_mutation() {
    let array = Array::new();
    let created = array.get_or_create(0, TypeKey::Array);

    created.as_array().unwrap().push(5);

    assert!(!created.is_virtual(), "Mutation should clear the Virtual bit");
}

