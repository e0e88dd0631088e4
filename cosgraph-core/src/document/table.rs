use super::indirect::IndirectObject;
use std::collections::{BTreeMap, BTreeSet};

/// Document-scoped map from object number to slot.
///
/// Slots refer to each other only through numbers looked up here, so
/// reference cycles in the graph never become ownership cycles.
#[derive(Debug, Default)]
pub struct ObjectTable {
    slots: BTreeMap<u32, IndirectObject>,
    /// Object-stream number to member object numbers.
    members: BTreeMap<u32, BTreeSet<u32>>,
    modified: BTreeSet<u32>,
    created: BTreeSet<u32>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, number: u32) -> Option<&IndirectObject> {
        self.slots.get(&number)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.slots.contains_key(&number)
    }

    /// Slots in ascending object-number order.
    pub fn slots(&self) -> impl Iterator<Item = &IndirectObject> {
        self.slots.values()
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.keys().copied()
    }

    /// Next number beyond the highest known one. Object 0 is never handed
    /// out.
    pub fn next_number(&self) -> u32 {
        self.slots
            .keys()
            .next_back()
            .map_or(1, |last| last.saturating_add(1))
    }

    pub(crate) fn insert(&mut self, slot: IndirectObject) {
        self.slots.insert(slot.number(), slot);
    }

    /// Inserts a slot created in this session.
    pub(crate) fn insert_created(&mut self, slot: IndirectObject) {
        self.created.insert(slot.number());
        self.insert(slot);
    }

    pub(crate) fn remove(&mut self, number: u32) -> Option<IndirectObject> {
        self.created.remove(&number);
        self.modified.remove(&number);
        self.slots.remove(&number)
    }

    pub(crate) fn mark_modified(&mut self, number: u32) {
        if self.slots.contains_key(&number) {
            self.modified.insert(number);
        }
    }

    pub fn is_modified(&self, number: u32) -> bool {
        self.modified.contains(&number)
    }

    pub fn modified(&self) -> impl Iterator<Item = &IndirectObject> {
        self.modified.iter().filter_map(|n| self.slots.get(n))
    }

    pub fn created(&self) -> impl Iterator<Item = &IndirectObject> {
        self.created.iter().filter_map(|n| self.slots.get(n))
    }

    pub(crate) fn add_member(&mut self, stream_number: u32, number: u32) {
        self.members.entry(stream_number).or_default().insert(number);
    }

    pub(crate) fn remove_member(&mut self, stream_number: u32, number: u32) {
        if let Some(members) = self.members.get_mut(&stream_number) {
            members.remove(&number);
            if members.is_empty() {
                self.members.remove(&stream_number);
            }
        }
    }

    /// Members of the object stream `stream_number`, ascending.
    pub fn members(&self, stream_number: u32) -> Vec<u32> {
        self.members
            .get(&stream_number)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}
