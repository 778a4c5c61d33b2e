//! Folder and item node model.
//!
//! # Responsibility
//! - Define the two node kinds that make up a shelf forest.
//! - Normalize user-provided names and tags before they reach the tree.
//!
//! # Invariants
//! - `id` is stable and never reused for another node.
//! - Folders and items share one id space.
//! - `Item::parent_folder_id` is owned by the tree; callers never set it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier shared by folders and items.
pub type NodeId = Uuid;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Returns current Unix time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Content category of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Link,
    Note,
    Document,
    Image,
    Video,
}

impl ItemKind {
    /// Stable storage/log name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Note => "note",
            Self::Document => "document",
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Parses a storage name back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "link" => Some(Self::Link),
            "note" => Some(Self::Note),
            "document" => Some(Self::Document),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Discriminant of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Folder,
    Item,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Item => "item",
        }
    }
}

/// Grouping node that owns an ordered list of children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Stable node id.
    pub id: NodeId,
    /// User-facing label.
    pub name: String,
    /// Child ids in display order. Maintained by the tree.
    pub children: Vec<NodeId>,
    /// Optional display color token.
    pub color: Option<String>,
    /// Optional display icon token.
    pub icon: Option<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Folder {
    /// Creates an empty folder with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates an empty folder with a caller-provided id.
    ///
    /// Used by hydration paths where identity already exists in the store.
    pub fn with_id(id: NodeId, name: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id,
            name: name.into(),
            children: Vec::new(),
            color: None,
            icon: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filed content leaf. Always lives inside exactly one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable node id.
    pub id: NodeId,
    /// User-facing label.
    pub name: String,
    /// Content category.
    pub kind: ItemKind,
    /// URL, markdown body or asset reference depending on `kind`.
    pub content: String,
    /// Owning folder. Rewritten by the tree on every attach.
    pub parent_folder_id: NodeId,
    /// Normalized tag set.
    pub tags: BTreeSet<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Item {
    /// Creates a detached item with a generated id.
    pub fn new(kind: ItemKind, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), kind, name, content)
    }

    /// Creates a detached item with a caller-provided id.
    pub fn with_id(
        id: NodeId,
        kind: ItemKind,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id,
            name: name.into(),
            kind,
            content: content.into(),
            parent_folder_id: Uuid::nil(),
            tags: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style tag assignment; tags are normalized.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }
}

/// One entry of the forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Folder(Folder),
    Item(Item),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Folder(folder) => folder.id,
            Self::Item(item) => item.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Folder(_) => NodeKind::Folder,
            Self::Item(_) => NodeKind::Item,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder(folder) => folder.name.as_str(),
            Self::Item(item) => item.name.as_str(),
        }
    }

    pub fn updated_at(&self) -> i64 {
        match self {
            Self::Folder(folder) => folder.updated_at,
            Self::Item(item) => item.updated_at,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Folder(_) => None,
            Self::Item(item) => Some(item),
        }
    }

    pub(crate) fn as_folder_mut(&mut self) -> Option<&mut Folder> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::Item(_) => None,
        }
    }

    pub(crate) fn as_item_mut(&mut self) -> Option<&mut Item> {
        match self {
            Self::Folder(_) => None,
            Self::Item(item) => Some(item),
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            Self::Folder(folder) => folder.name = name,
            Self::Item(item) => item.name = name,
        }
    }

    pub(crate) fn set_updated_at(&mut self, updated_at: i64) {
        match self {
            Self::Folder(folder) => folder.updated_at = updated_at,
            Self::Item(item) => item.updated_at = updated_at,
        }
    }
}

impl From<Folder> for Node {
    fn from(value: Folder) -> Self {
        Self::Folder(value)
    }
}

impl From<Item> for Node {
    fn from(value: Item) -> Self {
        Self::Item(value)
    }
}

/// Trims a display name; `None` when nothing is left.
pub fn normalize_name(value: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

/// Normalizes one tag: trimmed, inner whitespace collapsed, lowercase.
pub fn normalize_tag(tag: &str) -> Option<String> {
    normalize_name(tag).map(|value| value.to_lowercase())
}

/// Normalizes and deduplicates tag values.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|tag| normalize_tag(tag.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, normalize_tags, Item, ItemKind, Node};

    #[test]
    fn normalize_name_collapses_whitespace_and_rejects_blank() {
        assert_eq!(normalize_name("  Reading \n list ").as_deref(), Some("Reading list"));
        assert_eq!(normalize_name(" \t "), None);
    }

    #[test]
    fn normalize_tags_lowercases_and_dedups() {
        let tags = normalize_tags(["Rust", " rust ", "", "Deep  Dive"]);
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["deep dive".to_string(), "rust".to_string()]
        );
    }

    #[test]
    fn item_kind_round_trips_storage_names() {
        for kind in [
            ItemKind::Link,
            ItemKind::Note,
            ItemKind::Document,
            ItemKind::Image,
            ItemKind::Video,
        ] {
            assert_eq!(ItemKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ItemKind::parse("folder"), None);
    }

    #[test]
    fn node_serializes_with_type_tag() {
        let item = Item::new(ItemKind::Link, "Docs", "https://docs.rs").with_tags(["Ref"]);
        let value = serde_json::to_value(Node::from(item)).expect("node should serialize");
        assert_eq!(value["type"], "item");
        assert_eq!(value["kind"], "link");
        assert_eq!(value["tags"][0], "ref");
    }
}
