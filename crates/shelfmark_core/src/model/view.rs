//! Read-only projection handed to the rendering layer.

use crate::model::node::{ItemKind, Node, NodeId};
use crate::tree::forest::Forest;
use serde::Serialize;
use std::collections::BTreeSet;

/// Nested snapshot of one node and, for folders, everything beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeView {
    Folder {
        id: NodeId,
        name: String,
        color: Option<String>,
        icon: Option<String>,
        created_at: i64,
        updated_at: i64,
        children: Vec<NodeView>,
    },
    Item {
        id: NodeId,
        name: String,
        kind: ItemKind,
        content: String,
        parent_folder_id: NodeId,
        tags: BTreeSet<String>,
        created_at: i64,
        updated_at: i64,
    },
}

impl NodeView {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Folder { id, .. } | Self::Item { id, .. } => *id,
        }
    }

    /// Child views; empty for items.
    pub fn children(&self) -> &[NodeView] {
        match self {
            Self::Folder { children, .. } => children,
            Self::Item { .. } => &[],
        }
    }

    fn build(forest: &Forest, node: &Node) -> Self {
        match node {
            Node::Folder(folder) => Self::Folder {
                id: folder.id,
                name: folder.name.clone(),
                color: folder.color.clone(),
                icon: folder.icon.clone(),
                created_at: folder.created_at,
                updated_at: folder.updated_at,
                children: folder
                    .children
                    .iter()
                    .filter_map(|child| forest.get(*child))
                    .map(|child| Self::build(forest, child))
                    .collect(),
            },
            Node::Item(item) => Self::Item {
                id: item.id,
                name: item.name.clone(),
                kind: item.kind,
                content: item.content.clone(),
                parent_folder_id: item.parent_folder_id,
                tags: item.tags.clone(),
                created_at: item.created_at,
                updated_at: item.updated_at,
            },
        }
    }
}

/// Builds the nested view of every root folder in display order.
pub fn forest_view(forest: &Forest) -> Vec<NodeView> {
    forest
        .roots()
        .iter()
        .filter_map(|id| forest.get(*id))
        .map(|node| NodeView::build(forest, node))
        .collect()
}

/// What rendering sees after every accepted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub tree: Vec<NodeView>,
    pub active_drag_id: Option<NodeId>,
    pub hovered_target_id: Option<NodeId>,
}
