//! Generic traversal over nodes
//!
//! A [`Visitor`] dispatches on the kind of each node. The default methods
//! recurse into containers (skipping Virtual entries, never following
//! references) and return the node they were given, so an implementation
//! only overrides the kinds it cares about.

use crate::error::Result;
use crate::objects::{Node, NodeKind};

pub trait Visitor {
    fn visit(&mut self, node: &Node) -> Result<Node> {
        match node.kind() {
            NodeKind::Array => self.visit_array(node),
            NodeKind::Dictionary => self.visit_dictionary(node),
            NodeKind::Stream => self.visit_stream(node),
            NodeKind::Reference => self.visit_reference(node),
            _ => self.visit_atom(node),
        }
    }

    fn visit_atom(&mut self, node: &Node) -> Result<Node> {
        Ok(node.clone())
    }

    fn visit_array(&mut self, node: &Node) -> Result<Node> {
        walk_children(self, node)?;
        Ok(node.clone())
    }

    fn visit_dictionary(&mut self, node: &Node) -> Result<Node> {
        walk_children(self, node)?;
        Ok(node.clone())
    }

    fn visit_stream(&mut self, node: &Node) -> Result<Node> {
        walk_children(self, node)?;
        Ok(node.clone())
    }

    fn visit_reference(&mut self, node: &Node) -> Result<Node> {
        Ok(node.clone())
    }
}

/// Visits the non-virtual children of `node` in order.
pub fn walk_children<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> Result<()> {
    for child in node.children() {
        if !child.is_virtual() {
            visitor.visit(&child)?;
        }
    }
    Ok(())
}
