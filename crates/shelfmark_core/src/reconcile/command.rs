//! Mutation commands and the persistence requests they produce.

use crate::model::node::{Folder, Item, ItemKind, NodeId};
use crate::tree::mutation::{FolderStyle, ItemEdit};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Per-mutation identifier, monotonic within one reconciler.
///
/// In-flight bookkeeping is keyed by this id, never by node id, so two
/// overlapping edits of different nodes stay independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MutationId(pub u64);

impl Display for MutationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// One user-level change to the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Append a new empty folder under `parent` (root level for `None`).
    CreateFolder {
        folder: Folder,
        parent: Option<NodeId>,
    },
    /// Append a new item to `folder`.
    CreateItem { item: Item, folder: NodeId },
    /// Reparent and/or reorder one node.
    Move {
        id: NodeId,
        target: Option<NodeId>,
        index: Option<usize>,
    },
    Rename { id: NodeId, name: String },
    EditItem { id: NodeId, edit: ItemEdit },
    StyleFolder { id: NodeId, style: FolderStyle },
    /// Delete a node; folders go with their subtree.
    Delete { id: NodeId },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::CreateFolder { .. } => MutationKind::CreateFolder,
            Self::CreateItem { .. } => MutationKind::CreateItem,
            Self::Move { .. } => MutationKind::Move,
            Self::Rename { .. } => MutationKind::Rename,
            Self::EditItem { .. } => MutationKind::EditItem,
            Self::StyleFolder { .. } => MutationKind::StyleFolder,
            Self::Delete { .. } => MutationKind::Delete,
        }
    }

    /// The node this mutation is about.
    pub fn subject(&self) -> NodeId {
        match self {
            Self::CreateFolder { folder, .. } => folder.id,
            Self::CreateItem { item, .. } => item.id,
            Self::Move { id, .. }
            | Self::Rename { id, .. }
            | Self::EditItem { id, .. }
            | Self::StyleFolder { id, .. }
            | Self::Delete { id } => *id,
        }
    }
}

/// Mutation discriminant used in logs and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    CreateFolder,
    CreateItem,
    Move,
    Rename,
    EditItem,
    StyleFolder,
    Delete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateFolder => "create_folder",
            Self::CreateItem => "create_item",
            Self::Move => "move",
            Self::Rename => "rename",
            Self::EditItem => "edit_item",
            Self::StyleFolder => "style_folder",
            Self::Delete => "delete",
        }
    }
}

/// Field patch sent with `update_node`.
///
/// Outer `None` means "unchanged". For `parent_id`, `Some(None)` moves the
/// node to root level; for `color`/`icon`, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
}

impl NodePatch {
    /// Whether this patch changes parent membership or position.
    pub fn is_structural(&self) -> bool {
        self.parent_id.is_some() || self.index.is_some()
    }
}

/// Call the persistence adapter has to make for one committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PersistRequest {
    CreateFolder {
        folder: Folder,
        parent_id: Option<NodeId>,
    },
    CreateItem {
        folder_id: NodeId,
        item: Item,
    },
    UpdateNode {
        id: NodeId,
        patch: NodePatch,
    },
    DeleteNode {
        id: NodeId,
    },
}

impl PersistRequest {
    pub fn op(&self) -> &'static str {
        match self {
            Self::CreateFolder { .. } => "create_folder",
            Self::CreateItem { .. } => "create_item",
            Self::UpdateNode { .. } => "update_node",
            Self::DeleteNode { .. } => "delete_node",
        }
    }
}

/// Ticket returned by an optimistic commit; hand it to `persist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingPersist {
    pub mutation_id: MutationId,
    pub kind: MutationKind,
    pub node_id: NodeId,
    pub request: PersistRequest,
}
