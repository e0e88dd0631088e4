use bitflags::bitflags;

bitflags! {
    /// Per-node status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeStatus: u8 {
        /// Mutations are tracked and propagated to the owning slot.
        const UPDATEABLE = 0b0001;
        /// The node (or one of its descendants) changed since it was loaded.
        const UPDATED = 0b0010;
        /// Placeholder created by a get-or-create call; not serialized.
        const VIRTUAL = 0b0100;
        /// Materialized from the document's backing bytes.
        const ORIGINAL = 0b1000;
    }
}

impl Default for NodeStatus {
    fn default() -> Self {
        NodeStatus::UPDATEABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_updateable_only() {
        let status = NodeStatus::default();
        assert!(status.contains(NodeStatus::UPDATEABLE));
        assert!(!status.intersects(NodeStatus::UPDATED | NodeStatus::VIRTUAL | NodeStatus::ORIGINAL));
    }
}
