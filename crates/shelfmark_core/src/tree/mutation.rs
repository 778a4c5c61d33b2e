//! Structural mutation engine.
//!
//! # Responsibility
//! - Provide detach/attach/move primitives over the forest arena.
//! - Provide create/rename/edit/delete operations built on them.
//!
//! # Invariants
//! - Every operation is all-or-nothing: on `Err` the forest is unchanged.
//! - Ids stay unique across the forest; attach fails loudly on collision.
//! - Folder moves pass the cycle guard before anything is detached.
//! - Sibling order only changes at the positions a mutation names.

use crate::model::node::{
    normalize_name, normalize_tags, now_epoch_ms, Folder, Item, ItemKind, Node, NodeId,
};
use crate::tree::error::{TreeError, TreeResult};
use crate::tree::forest::{Forest, Placement};
use crate::tree::guard;
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Nodes taken out of a forest as one unit, root first (pre-order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    root: NodeId,
    nodes: Vec<Node>,
}

impl Subtree {
    /// Wraps a single fresh node. Any folder children ids are dropped; use
    /// [`detach`] to carry a populated folder.
    pub fn from_node(node: impl Into<Node>) -> Self {
        let mut node = node.into();
        if let Some(folder) = node.as_folder_mut() {
            folder.children.clear();
        }
        Self {
            root: node.id(),
            nodes: vec![node],
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(Node::id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Result of [`detach`]: the removed subtree and where it used to sit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    pub subtree: Subtree,
    pub origin: Placement,
}

/// Result of [`move_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: Placement,
    pub to: Placement,
}

impl MoveOutcome {
    /// Whether the node kept its parent and index.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Partial item content update. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEdit {
    pub content: Option<String>,
    pub kind: Option<ItemKind>,
    /// Full replacement tag set; normalized on apply.
    pub tags: Option<BTreeSet<String>>,
}

/// Folder decoration, replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderStyle {
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Removes `id` (and its subtree) from its parent's children or the root list.
///
/// # Errors
/// - `NotFound` when `id` is absent.
pub fn detach(forest: &mut Forest, id: NodeId) -> TreeResult<Detached> {
    let origin = forest.placement(id)?;
    let ids = forest.subtree_ids(id)?;
    forest.children_mut(origin.parent)?.remove(origin.index);

    let nodes = ids
        .into_iter()
        .filter_map(|node_id| forest.remove_slot(node_id))
        .collect();
    Ok(Detached {
        subtree: Subtree { root: id, nodes },
        origin,
    })
}

/// Inserts `subtree` under `target` (root level for `None`) at `index`.
///
/// `index` defaults to append and is clamped to the sibling count.
///
/// # Errors
/// - `NotFound` / `NotAFolder` when the target folder is invalid.
/// - `DuplicateId` when any subtree id already exists in the forest.
/// - `ItemRequiresFolder` when an item would land at root level.
pub fn attach(
    forest: &mut Forest,
    subtree: Subtree,
    target: Option<NodeId>,
    index: Option<usize>,
) -> TreeResult<Placement> {
    try_attach(forest, subtree, target, index).map_err(|(err, _)| err)
}

/// Moves `id` under `target` at `index` as one atomic step.
///
/// `index` is resolved against the target's children with the moved node
/// removed. Dropping a node back on its own parent and index is a confirmed
/// no-op that still refreshes `updated_at`.
///
/// # Errors
/// - `CycleRejected` for self-moves and folder-into-descendant moves.
/// - `NotFound` / `NotAFolder` / `ItemRequiresFolder` for invalid targets.
pub fn move_node(
    forest: &mut Forest,
    id: NodeId,
    target: Option<NodeId>,
    index: Option<usize>,
) -> TreeResult<MoveOutcome> {
    let from = forest.placement(id)?;
    guard::check_move(forest, id, target)?;
    let target_len = forest.children(target)?.len();
    if target.is_none() && !forest.get(id).is_some_and(Node::is_folder) {
        return Err(TreeError::ItemRequiresFolder(id));
    }

    if target == from.parent {
        let available = target_len.saturating_sub(1);
        let to_index = index.unwrap_or(available).min(available);
        if to_index == from.index {
            forest.node_mut(id)?.set_updated_at(now_epoch_ms());
            return Ok(MoveOutcome { from, to: from });
        }
    }

    let to = relocate(forest, id, target, index)?;
    forest.node_mut(id)?.set_updated_at(now_epoch_ms());
    Ok(MoveOutcome { from, to })
}

/// Appends a new empty folder under `parent` (root level for `None`).
pub fn create_folder(
    forest: &mut Forest,
    mut folder: Folder,
    parent: Option<NodeId>,
) -> TreeResult<Placement> {
    folder.name = normalize_name(&folder.name).ok_or(TreeError::InvalidName)?;
    attach(forest, Subtree::from_node(folder), parent, None)
}

/// Appends a new item to `folder_id`.
pub fn create_item(forest: &mut Forest, mut item: Item, folder_id: NodeId) -> TreeResult<Placement> {
    item.name = normalize_name(&item.name).ok_or(TreeError::InvalidName)?;
    item.tags = normalize_tags(&item.tags);
    attach(forest, Subtree::from_node(item), Some(folder_id), None)
}

/// Renames a folder or item.
pub fn rename(forest: &mut Forest, id: NodeId, name: &str) -> TreeResult<()> {
    let name = normalize_name(name).ok_or(TreeError::InvalidName)?;
    let node = forest.node_mut(id)?;
    node.set_name(name);
    node.set_updated_at(now_epoch_ms());
    Ok(())
}

/// Applies a partial content update to an item.
pub fn edit_item(forest: &mut Forest, id: NodeId, edit: &ItemEdit) -> TreeResult<()> {
    let item = forest
        .node_mut(id)?
        .as_item_mut()
        .ok_or(TreeError::NotAnItem(id))?;
    if let Some(content) = &edit.content {
        item.content = content.clone();
    }
    if let Some(kind) = edit.kind {
        item.kind = kind;
    }
    if let Some(tags) = &edit.tags {
        item.tags = normalize_tags(tags);
    }
    item.updated_at = now_epoch_ms();
    Ok(())
}

/// Replaces a folder's color and icon.
pub fn set_folder_style(forest: &mut Forest, id: NodeId, style: &FolderStyle) -> TreeResult<()> {
    let folder = forest
        .node_mut(id)?
        .as_folder_mut()
        .ok_or(TreeError::NotAFolder(id))?;
    folder.color = style.color.clone();
    folder.icon = style.icon.clone();
    folder.updated_at = now_epoch_ms();
    Ok(())
}

/// Deletes `id`; folders take their whole subtree with them.
pub fn delete(forest: &mut Forest, id: NodeId) -> TreeResult<Detached> {
    detach(forest, id)
}

/// Moves a node without touching timestamps or consulting the guard.
///
/// Used for live previews and rollbacks. A target inside the moved subtree
/// disappears on detach, so this still cannot produce a cycle.
pub(crate) fn relocate(
    forest: &mut Forest,
    id: NodeId,
    target: Option<NodeId>,
    index: Option<usize>,
) -> TreeResult<Placement> {
    let Detached { subtree, origin } = detach(forest, id)?;
    match try_attach(forest, subtree, target, index) {
        Ok(placement) => Ok(placement),
        Err((err, subtree)) => {
            if let Err((restore_err, _)) =
                try_attach(forest, subtree, origin.parent, Some(origin.index))
            {
                error!(
                    "event=relocate_restore module=tree status=error node_id={} error_code={}",
                    id,
                    restore_err.code()
                );
            }
            Err(err)
        }
    }
}

/// Copies name/content/style fields and `updated_at` from `before` onto the
/// live node with the same id. Structure (parent, children) is untouched.
pub(crate) fn restore_fields(forest: &mut Forest, before: &Node) -> TreeResult<()> {
    let id = before.id();
    match (forest.node_mut(id)?, before) {
        (Node::Folder(live), Node::Folder(prior)) => {
            live.name = prior.name.clone();
            live.color = prior.color.clone();
            live.icon = prior.icon.clone();
            live.updated_at = prior.updated_at;
        }
        (Node::Item(live), Node::Item(prior)) => {
            live.name = prior.name.clone();
            live.kind = prior.kind;
            live.content = prior.content.clone();
            live.tags = prior.tags.clone();
            live.updated_at = prior.updated_at;
        }
        (Node::Folder(_), Node::Item(_)) => return Err(TreeError::NotAnItem(id)),
        (Node::Item(_), Node::Folder(_)) => return Err(TreeError::NotAFolder(id)),
    }
    Ok(())
}

/// Sets `updated_at` without any other change.
pub(crate) fn set_updated_at(forest: &mut Forest, id: NodeId, updated_at: i64) -> TreeResult<()> {
    forest.node_mut(id)?.set_updated_at(updated_at);
    Ok(())
}

/// Attach that hands the subtree back on failure so callers can restore it.
fn try_attach(
    forest: &mut Forest,
    subtree: Subtree,
    target: Option<NodeId>,
    index: Option<usize>,
) -> Result<Placement, (TreeError, Subtree)> {
    if let Err(err) = validate_attach(forest, &subtree, target) {
        return Err((err, subtree));
    }

    let root = subtree.root;
    let index = match forest.children_mut(target) {
        Ok(siblings) => {
            let index = index.unwrap_or(siblings.len()).min(siblings.len());
            siblings.insert(index, root);
            index
        }
        Err(err) => return Err((err, subtree)),
    };

    let mut inner_parents = HashMap::new();
    for node in &subtree.nodes {
        if let Node::Folder(folder) = node {
            for child in &folder.children {
                inner_parents.insert(*child, folder.id);
            }
        }
    }
    for mut node in subtree.nodes {
        let id = node.id();
        let parent = if id == root {
            target
        } else {
            inner_parents.get(&id).copied()
        };
        if let (Some(item), Some(folder_id)) = (node.as_item_mut(), parent) {
            item.parent_folder_id = folder_id;
        }
        forest.insert_slot(node, parent);
    }

    Ok(Placement {
        parent: target,
        index,
    })
}

fn validate_attach(forest: &Forest, subtree: &Subtree, target: Option<NodeId>) -> TreeResult<()> {
    forest.children(target)?;
    if target.is_none() && !subtree.root().is_folder() {
        return Err(TreeError::ItemRequiresFolder(subtree.root));
    }
    let mut seen = BTreeSet::new();
    for id in subtree.ids() {
        if forest.contains(id) || !seen.insert(id) {
            return Err(TreeError::DuplicateId(id));
        }
    }
    Ok(())
}
