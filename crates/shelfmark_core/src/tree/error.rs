//! Tree mutation errors.

use crate::model::node::NodeId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by locator and mutation engine operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors from structural tree operations.
///
/// Every variant aborts the mutation with the forest left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Node id is absent from the forest.
    NotFound(NodeId),
    /// Node id exists but is not a folder where a folder is required.
    NotAFolder(NodeId),
    /// Node id exists but is not an item where an item is required.
    NotAnItem(NodeId),
    /// Attach would create a second node with this id.
    DuplicateId(NodeId),
    /// Folder move targets itself or one of its own descendants.
    CycleRejected { node: NodeId, target: NodeId },
    /// Items cannot be placed at root level.
    ItemRequiresFolder(NodeId),
    /// Display name is blank after normalization.
    InvalidName,
}

impl TreeError {
    /// Stable short code for structured log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::NotAFolder(_) => "not_a_folder",
            Self::NotAnItem(_) => "not_an_item",
            Self::DuplicateId(_) => "duplicate_id",
            Self::CycleRejected { .. } => "cycle_rejected",
            Self::ItemRequiresFolder(_) => "item_requires_folder",
            Self::InvalidName => "invalid_name",
        }
    }
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "node not found: {id}"),
            Self::NotAFolder(id) => write!(f, "node is not a folder: {id}"),
            Self::NotAnItem(id) => write!(f, "node is not an item: {id}"),
            Self::DuplicateId(id) => write!(f, "node id already exists: {id}"),
            Self::CycleRejected { node, target } => {
                write!(f, "move would create cycle: node {node} under folder {target}")
            }
            Self::ItemRequiresFolder(id) => {
                write!(f, "item must be placed inside a folder: {id}")
            }
            Self::InvalidName => write!(f, "display name must not be blank"),
        }
    }
}

impl Error for TreeError {}
