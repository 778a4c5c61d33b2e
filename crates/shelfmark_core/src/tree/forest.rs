//! Id-indexed forest arena and locator.
//!
//! # Responsibility
//! - Own every node of one session's forest in a flat `id -> slot` map.
//! - Answer locate/parent/order queries without walking the tree.
//!
//! # Invariants
//! - `slots[id].parent` and the parent's `children` list always agree.
//! - Root-level entries are folders only, listed in `roots` in display order.
//! - Only the mutation engine writes through the `pub(crate)` primitives.

use crate::model::node::{Folder, Item, Node, NodeId};
use crate::tree::error::{TreeError, TreeResult};
use std::collections::HashMap;

/// Position of a node: parent folder (`None` = root level) and sibling index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent: Option<NodeId>,
    pub index: usize,
}

/// Locate result: the node plus its immediate parent folder.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub node: &'a Node,
    /// `None` when the node is a root-level folder.
    pub parent: Option<&'a Folder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
}

/// The full collection of root folders and everything beneath them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    slots: HashMap<NodeId, Slot>,
    roots: Vec<NodeId>,
}

impl Forest {
    /// Creates an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes (folders and items).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Root-level folder ids in display order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(&id).map(|slot| &slot.node)
    }

    pub fn folder(&self, id: NodeId) -> Option<&Folder> {
        self.get(id).and_then(Node::as_folder)
    }

    pub fn item(&self, id: NodeId) -> Option<&Item> {
        self.get(id).and_then(Node::as_item)
    }

    /// Finds a node and its parent folder.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent.
    pub fn locate(&self, id: NodeId) -> TreeResult<Located<'_>> {
        let slot = self.slots.get(&id).ok_or(TreeError::NotFound(id))?;
        let parent = match slot.parent {
            Some(parent_id) => Some(
                self.folder(parent_id)
                    .ok_or(TreeError::NotFound(parent_id))?,
            ),
            None => None,
        };
        Ok(Located {
            node: &slot.node,
            parent,
        })
    }

    /// Parent folder id of `id`; `Ok(None)` for root-level folders.
    pub fn parent_of(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        self.slots
            .get(&id)
            .map(|slot| slot.parent)
            .ok_or(TreeError::NotFound(id))
    }

    /// Current parent and sibling index of `id`.
    pub fn placement(&self, id: NodeId) -> TreeResult<Placement> {
        let parent = self.parent_of(id)?;
        let index = self
            .children(parent)?
            .iter()
            .position(|child| *child == id)
            .ok_or(TreeError::NotFound(id))?;
        Ok(Placement { parent, index })
    }

    /// Ordered child ids of a folder, or the root list for `None`.
    ///
    /// # Errors
    /// - `NotFound` when the folder is absent.
    /// - `NotAFolder` when `parent` names an item.
    pub fn children(&self, parent: Option<NodeId>) -> TreeResult<&[NodeId]> {
        match parent {
            None => Ok(&self.roots),
            Some(parent_id) => match self.get(parent_id) {
                Some(Node::Folder(folder)) => Ok(&folder.children),
                Some(Node::Item(_)) => Err(TreeError::NotAFolder(parent_id)),
                None => Err(TreeError::NotFound(parent_id)),
            },
        }
    }

    /// Ids of `id` and everything beneath it, pre-order.
    pub fn subtree_ids(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        if !self.contains(id) {
            return Err(TreeError::NotFound(id));
        }
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            ids.push(current);
            if let Some(folder) = self.folder(current) {
                stack.extend(folder.children.iter().rev().copied());
            }
        }
        Ok(ids)
    }

    /// Iterates nodes in arbitrary order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.slots.values().map(|slot| &slot.node)
    }

    /// Iterates every node in display order (roots first, depth-first).
    pub fn walk(&self) -> impl Iterator<Item = &Node> + '_ {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = self.get(id)?;
            if let Node::Folder(folder) = node {
                stack.extend(folder.children.iter().rev().copied());
            }
            Some(node)
        })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node> {
        self.slots
            .get_mut(&id)
            .map(|slot| &mut slot.node)
            .ok_or(TreeError::NotFound(id))
    }

    pub(crate) fn children_mut(&mut self, parent: Option<NodeId>) -> TreeResult<&mut Vec<NodeId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(parent_id) => match self.slots.get_mut(&parent_id) {
                Some(Slot {
                    node: Node::Folder(folder),
                    ..
                }) => Ok(&mut folder.children),
                Some(_) => Err(TreeError::NotAFolder(parent_id)),
                None => Err(TreeError::NotFound(parent_id)),
            },
        }
    }

    /// Inserts a slot without touching any children list.
    pub(crate) fn insert_slot(&mut self, node: Node, parent: Option<NodeId>) {
        self.slots.insert(node.id(), Slot { node, parent });
    }

    pub(crate) fn remove_slot(&mut self, id: NodeId) -> Option<Node> {
        self.slots.remove(&id).map(|slot| slot.node)
    }
}
