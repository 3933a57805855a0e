//! Index-based link table.
//!
//! Each node stores its parent id and an ordered list of child ids. Both sides of a link
//! change under the same lock, so a reader never sees a half-linked pair.

use crate::framework::actor_ref::ActorId;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
struct LinkNode {
    parent: Option<ActorId>,
    children: Vec<ActorId>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LinkError {
    /// The child already has this other supervisor.
    AlreadyLinked(ActorId),
    SelfLink,
}

#[derive(Debug, Default)]
pub struct LinkTable {
    nodes: Mutex<HashMap<ActorId, LinkNode>>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `child` under `parent`. Re-linking an existing pair is a no-op.
    pub fn link(&self, parent: ActorId, child: ActorId) -> Result<(), LinkError> {
        if parent == child {
            return Err(LinkError::SelfLink);
        }
        let mut nodes = self.nodes.lock();
        match nodes.get(&child).and_then(|n| n.parent) {
            Some(existing) if existing == parent => return Ok(()),
            Some(existing) => return Err(LinkError::AlreadyLinked(existing)),
            None => {}
        }
        nodes.entry(child).or_default().parent = Some(parent);
        nodes.entry(parent).or_default().children.push(child);
        Ok(())
    }

    /// Removes the pair. Returns whether it existed.
    pub fn unlink(&self, parent: ActorId, child: ActorId) -> bool {
        let mut nodes = self.nodes.lock();
        let linked = nodes.get(&child).and_then(|n| n.parent) == Some(parent);
        if !linked {
            return false;
        }
        if let Some(node) = nodes.get_mut(&child) {
            node.parent = None;
        }
        if let Some(node) = nodes.get_mut(&parent) {
            node.children.retain(|&c| c != child);
        }
        true
    }

    /// Drops every link touching `id` and returns the children it had.
    pub fn detach(&self, id: ActorId) -> Vec<ActorId> {
        let mut nodes = self.nodes.lock();
        let Some(node) = nodes.remove(&id) else {
            return Vec::new();
        };
        if let Some(parent) = node.parent {
            if let Some(p) = nodes.get_mut(&parent) {
                p.children.retain(|&c| c != id);
            }
        }
        for child in &node.children {
            if let Some(c) = nodes.get_mut(child) {
                c.parent = None;
            }
        }
        node.children
    }

    pub fn parent(&self, id: ActorId) -> Option<ActorId> {
        self.nodes.lock().get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ActorId) -> Vec<ActorId> {
        self.nodes
            .lock()
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn is_linked(&self, parent: ActorId, child: ActorId) -> bool {
        self.parent(child) == Some(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_records_both_sides_in_order() {
        let links = LinkTable::new();
        links.link(1, 2).unwrap();
        links.link(1, 3).unwrap();

        assert_eq!(links.children(1), vec![2, 3]);
        assert_eq!(links.parent(2), Some(1));
        assert_eq!(links.parent(3), Some(1));
        assert!(links.link(1, 2).is_ok());
        assert_eq!(links.children(1), vec![2, 3]);
    }

    #[test]
    fn child_has_at_most_one_supervisor() {
        let links = LinkTable::new();
        links.link(1, 2).unwrap();
        assert_eq!(links.link(4, 2), Err(LinkError::AlreadyLinked(1)));
        assert_eq!(links.link(5, 5), Err(LinkError::SelfLink));
    }

    #[test]
    fn unlink_removes_both_sides() {
        let links = LinkTable::new();
        links.link(1, 2).unwrap();
        assert!(links.unlink(1, 2));
        assert!(!links.unlink(1, 2));
        assert_eq!(links.parent(2), None);
        assert!(links.children(1).is_empty());
    }

    #[test]
    fn detach_orphans_children_and_leaves_parent() {
        let links = LinkTable::new();
        links.link(1, 2).unwrap();
        links.link(2, 3).unwrap();
        links.link(2, 4).unwrap();

        assert_eq!(links.detach(2), vec![3, 4]);
        assert!(links.children(1).is_empty());
        assert_eq!(links.parent(3), None);
        assert_eq!(links.parent(4), None);
    }
}
