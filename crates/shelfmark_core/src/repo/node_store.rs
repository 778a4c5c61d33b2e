//! SQLite-backed node store and persistence adapter.
//!
//! # Responsibility
//! - Persist folder/item rows, ordering and tags.
//! - Implement `PersistenceAdapter` so a reconciler can sync against it.
//! - Hydrate a `Forest` at session start.
//!
//! # Invariants
//! - Only active (`is_deleted=0`) nodes are returned.
//! - Child listing is deterministic: `sort_order ASC, node_uuid ASC`.
//! - Moves renumber the destination siblings so reorders are durable.
//! - The store re-checks parent kind and acyclicity; it never trusts callers.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::node::{Folder, Item, ItemKind, Node, NodeId, NodeKind};
use crate::reconcile::adapter::{PersistResult, PersistenceAdapter, PersistenceError};
use crate::reconcile::command::NodePatch;
use crate::tree::forest::Forest;
use crate::tree::mutation::{create_folder, create_item};
use async_trait::async_trait;
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const NODE_COLUMNS: &str = "node_uuid,
    kind,
    parent_uuid,
    name,
    item_kind,
    content,
    color,
    icon,
    created_at,
    updated_at";

/// Result type used by node store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from node store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection mutex was poisoned by a panicking writer.
    LockPoisoned,
    /// Target node does not exist or is soft-deleted.
    NodeNotFound(NodeId),
    /// Target node exists but is not a folder.
    NodeNotFolder(NodeId),
    /// Target node exists but is not an item.
    NodeNotItem(NodeId),
    /// Insert would reuse an existing id.
    DuplicateId(NodeId),
    /// Items cannot be stored at root level.
    ItemRequiresFolder(NodeId),
    /// Move would create a parent-child cycle.
    CycleDetected { node: NodeId, parent: NodeId },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid node.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "node store connection lock poisoned"),
            Self::NodeNotFound(id) => write!(f, "stored node not found: {id}"),
            Self::NodeNotFolder(id) => write!(f, "stored node is not a folder: {id}"),
            Self::NodeNotItem(id) => write!(f, "stored node is not an item: {id}"),
            Self::DuplicateId(id) => write!(f, "stored node id already exists: {id}"),
            Self::ItemRequiresFolder(id) => write!(f, "item must be stored inside a folder: {id}"),
            Self::CycleDetected { node, parent } => {
                write!(f, "move would create cycle: node {node} under parent {parent}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "node store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "node store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid stored node data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<StoreError> for PersistenceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Db(_) | StoreError::LockPoisoned => Self::Transport(value.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

/// One `nodes` row before children/tags are attached.
#[derive(Debug, Clone)]
struct NodeRow {
    id: NodeId,
    kind: NodeKind,
    parent: Option<NodeId>,
    name: String,
    item_kind: Option<ItemKind>,
    content: Option<String>,
    color: Option<String>,
    icon: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl NodeRow {
    fn into_node(self, children: Vec<NodeId>, tags: BTreeSet<String>) -> StoreResult<Node> {
        match self.kind {
            NodeKind::Folder => Ok(Node::Folder(Folder {
                id: self.id,
                name: self.name,
                children,
                color: self.color,
                icon: self.icon,
                created_at: self.created_at,
                updated_at: self.updated_at,
            })),
            NodeKind::Item => {
                let kind = self.item_kind.ok_or_else(|| {
                    StoreError::InvalidData(format!("item {} has no item_kind", self.id))
                })?;
                let parent_folder_id = self.parent.ok_or(StoreError::ItemRequiresFolder(self.id))?;
                Ok(Node::Item(Item {
                    id: self.id,
                    name: self.name,
                    kind,
                    content: self.content.unwrap_or_default(),
                    parent_folder_id,
                    tags,
                    created_at: self.created_at,
                    updated_at: self.updated_at,
                }))
            }
        }
    }
}

/// SQLite-backed node store.
pub struct SqliteNodeStore {
    conn: Mutex<Connection>,
}

impl SqliteNodeStore {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts one folder, appended under `parent`.
    pub fn insert_folder(&self, folder: &Folder, parent: Option<NodeId>) -> StoreResult<Folder> {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        ensure_id_unused(&tx, folder.id)?;
        if let Some(parent) = parent {
            ensure_active_folder(&tx, parent)?;
        }
        let sort_order = next_sort_order(&tx, parent)?;
        tx.execute(
            "INSERT INTO nodes (
                node_uuid, kind, parent_uuid, name, item_kind, content,
                color, icon, sort_order, is_deleted, created_at, updated_at
            ) VALUES (?1, 'folder', ?2, ?3, NULL, NULL, ?4, ?5, ?6, 0, ?7, ?8);",
            params![
                folder.id.to_string(),
                parent.map(|value| value.to_string()),
                folder.name,
                folder.color,
                folder.icon,
                sort_order,
                folder.created_at,
                folder.updated_at,
            ],
        )?;
        tx.commit()?;

        match load_node(&conn, folder.id)? {
            Node::Folder(stored) => Ok(stored),
            Node::Item(_) => Err(StoreError::NodeNotFolder(folder.id)),
        }
    }

    /// Inserts one item, appended to `folder_id`.
    pub fn insert_item(&self, folder_id: NodeId, item: &Item) -> StoreResult<Item> {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        ensure_id_unused(&tx, item.id)?;
        ensure_active_folder(&tx, folder_id)?;
        let sort_order = next_sort_order(&tx, Some(folder_id))?;
        tx.execute(
            "INSERT INTO nodes (
                node_uuid, kind, parent_uuid, name, item_kind, content,
                color, icon, sort_order, is_deleted, created_at, updated_at
            ) VALUES (?1, 'item', ?2, ?3, ?4, ?5, NULL, NULL, ?6, 0, ?7, ?8);",
            params![
                item.id.to_string(),
                folder_id.to_string(),
                item.name,
                item.kind.as_str(),
                item.content,
                sort_order,
                item.created_at,
                item.updated_at,
            ],
        )?;
        replace_tags(&tx, item.id, &item.tags)?;
        tx.commit()?;

        match load_node(&conn, item.id)? {
            Node::Item(stored) => Ok(stored),
            Node::Folder(_) => Err(StoreError::NodeNotItem(item.id)),
        }
    }

    /// Loads one active node with children ids (folders) or tags (items).
    pub fn get_node(&self, id: NodeId) -> StoreResult<Option<Node>> {
        let conn = self.lock()?;
        match load_node(&conn, id) {
            Ok(node) => Ok(Some(node)),
            Err(StoreError::NodeNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Lists active child ids under a folder, or root-level ids for `None`.
    pub fn list_children(&self, parent: Option<NodeId>) -> StoreResult<Vec<NodeId>> {
        let conn = self.lock()?;
        list_child_ids(&conn, parent)
    }

    /// Applies a move/rename/content/style patch atomically.
    pub fn apply_patch(&self, id: NodeId, patch: &NodePatch) -> StoreResult<Node> {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        let row = load_row(&tx, id)?.ok_or(StoreError::NodeNotFound(id))?;

        if patch.is_structural() {
            let parent = patch.parent_id.unwrap_or(row.parent);
            move_row(&tx, &row, parent, patch.index)?;
        }
        if let Some(name) = &patch.name {
            tx.execute(
                "UPDATE nodes SET name = ?2 WHERE node_uuid = ?1 AND is_deleted = 0;",
                params![id.to_string(), name],
            )?;
        }
        if patch.content.is_some() || patch.kind.is_some() || patch.tags.is_some() {
            if row.kind != NodeKind::Item {
                return Err(StoreError::NodeNotItem(id));
            }
            if let Some(content) = &patch.content {
                tx.execute(
                    "UPDATE nodes SET content = ?2 WHERE node_uuid = ?1;",
                    params![id.to_string(), content],
                )?;
            }
            if let Some(kind) = patch.kind {
                tx.execute(
                    "UPDATE nodes SET item_kind = ?2 WHERE node_uuid = ?1;",
                    params![id.to_string(), kind.as_str()],
                )?;
            }
            if let Some(tags) = &patch.tags {
                replace_tags(&tx, id, tags)?;
            }
        }
        if patch.color.is_some() || patch.icon.is_some() {
            if row.kind != NodeKind::Folder {
                return Err(StoreError::NodeNotFolder(id));
            }
            if let Some(color) = &patch.color {
                tx.execute(
                    "UPDATE nodes SET color = ?2 WHERE node_uuid = ?1;",
                    params![id.to_string(), color],
                )?;
            }
            if let Some(icon) = &patch.icon {
                tx.execute(
                    "UPDATE nodes SET icon = ?2 WHERE node_uuid = ?1;",
                    params![id.to_string(), icon],
                )?;
            }
        }

        tx.execute(
            "UPDATE nodes
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE node_uuid = ?1;",
            [id.to_string()],
        )?;
        tx.commit()?;
        load_node(&conn, id)
    }

    /// Soft-deletes one node and, for folders, its whole subtree.
    pub fn soft_delete(&self, id: NodeId) -> StoreResult<()> {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        load_row(&tx, id)?.ok_or(StoreError::NodeNotFound(id))?;
        tx.execute(
            "WITH RECURSIVE subtree(node_uuid) AS (
                SELECT node_uuid
                FROM nodes
                WHERE node_uuid = ?1
                  AND is_deleted = 0
                UNION ALL
                SELECT child.node_uuid
                FROM nodes child
                INNER JOIN subtree parent ON child.parent_uuid = parent.node_uuid
                WHERE child.is_deleted = 0
            )
            UPDATE nodes
            SET is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
            WHERE node_uuid IN (SELECT node_uuid FROM subtree)
              AND is_deleted = 0;",
            [id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Builds a forest from every active row.
    ///
    /// Rows whose parent is missing, deleted or not a folder are skipped and
    /// logged instead of failing the whole load.
    pub fn load_forest(&self) -> StoreResult<Forest> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS}
             FROM nodes
             WHERE is_deleted = 0
             ORDER BY sort_order ASC, node_uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut by_parent: HashMap<Option<NodeId>, Vec<NodeRow>> = HashMap::new();
        let mut total = 0usize;
        while let Some(row) = rows.next()? {
            let row = parse_node_row(row)?;
            by_parent.entry(row.parent).or_default().push(row);
            total += 1;
        }
        let mut tags = load_all_tags(&conn)?;

        let mut forest = Forest::new();
        let mut queue = VecDeque::from([None]);
        while let Some(parent) = queue.pop_front() {
            for row in by_parent.remove(&parent).unwrap_or_default() {
                let id = row.id;
                let node = row.into_node(Vec::new(), tags.remove(&id).unwrap_or_default());
                let inserted = match (node, parent) {
                    (Ok(Node::Folder(folder)), _) => create_folder(&mut forest, folder, parent)
                        .map(|_| queue.push_back(Some(id)))
                        .map_err(|err| err.code()),
                    (Ok(Node::Item(item)), Some(folder_id)) => {
                        create_item(&mut forest, item, folder_id)
                            .map(|_| ())
                            .map_err(|err| err.code())
                    }
                    (Ok(Node::Item(_)), None) => Err("item_requires_folder"),
                    (Err(_), _) => Err("invalid_data"),
                };
                if let Err(code) = inserted {
                    warn!(
                        "event=forest_load module=repo status=skipped node_id={id} error_code={code}"
                    );
                }
            }
        }

        let orphaned: usize = by_parent.values().map(Vec::len).sum();
        if orphaned > 0 {
            warn!("event=forest_load module=repo status=orphans count={orphaned}");
        }
        info!(
            "event=forest_load module=repo status=ok rows={} nodes={}",
            total,
            forest.len()
        );
        Ok(forest)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl PersistenceAdapter for SqliteNodeStore {
    async fn create_folder(
        &self,
        folder: &Folder,
        parent_id: Option<NodeId>,
    ) -> PersistResult<Folder> {
        self.insert_folder(folder, parent_id).map_err(Into::into)
    }

    async fn create_item(&self, folder_id: NodeId, item: &Item) -> PersistResult<Item> {
        self.insert_item(folder_id, item).map_err(Into::into)
    }

    async fn update_node(&self, id: NodeId, patch: &NodePatch) -> PersistResult<Node> {
        self.apply_patch(id, patch).map_err(Into::into)
    }

    async fn delete_node(&self, id: NodeId) -> PersistResult<()> {
        self.soft_delete(id).map_err(Into::into)
    }
}

fn move_row(
    conn: &Connection,
    row: &NodeRow,
    parent: Option<NodeId>,
    index: Option<usize>,
) -> StoreResult<()> {
    match parent {
        Some(parent_id) => {
            if parent_id == row.id {
                return Err(StoreError::CycleDetected {
                    node: row.id,
                    parent: parent_id,
                });
            }
            ensure_active_folder(conn, parent_id)?;
            if would_create_cycle(conn, row.id, parent_id)? {
                return Err(StoreError::CycleDetected {
                    node: row.id,
                    parent: parent_id,
                });
            }
        }
        None if row.kind == NodeKind::Item => return Err(StoreError::ItemRequiresFolder(row.id)),
        None => {}
    }

    let mut sibling_ids = list_child_ids(conn, parent)?;
    sibling_ids.retain(|id| *id != row.id);
    let target_index = index.unwrap_or(sibling_ids.len()).min(sibling_ids.len());
    sibling_ids.insert(target_index, row.id);

    conn.execute(
        "UPDATE nodes SET parent_uuid = ?2 WHERE node_uuid = ?1 AND is_deleted = 0;",
        params![row.id.to_string(), parent.map(|value| value.to_string())],
    )?;
    for (order, id) in sibling_ids.into_iter().enumerate() {
        conn.execute(
            "UPDATE nodes SET sort_order = ?2 WHERE node_uuid = ?1 AND is_deleted = 0;",
            params![id.to_string(), order as i64],
        )?;
    }
    Ok(())
}

fn would_create_cycle(
    conn: &Connection,
    node: NodeId,
    candidate_parent: NodeId,
) -> StoreResult<bool> {
    let mut visited = HashSet::new();
    let mut cursor = Some(candidate_parent);
    while let Some(current) = cursor {
        if current == node || !visited.insert(current) {
            return Ok(true);
        }
        cursor = load_row(conn, current)?
            .ok_or(StoreError::NodeNotFound(current))?
            .parent;
    }
    Ok(false)
}

fn load_node(conn: &Connection, id: NodeId) -> StoreResult<Node> {
    let row = load_row(conn, id)?.ok_or(StoreError::NodeNotFound(id))?;
    match row.kind {
        NodeKind::Folder => {
            let children = list_child_ids(conn, Some(id))?;
            row.into_node(children, BTreeSet::new())
        }
        NodeKind::Item => {
            let tags = load_tags(conn, id)?;
            row.into_node(Vec::new(), tags)
        }
    }
}

fn load_row(conn: &Connection, id: NodeId) -> StoreResult<Option<NodeRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NODE_COLUMNS}
         FROM nodes
         WHERE node_uuid = ?1
           AND is_deleted = 0;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_node_row(row)?)),
        None => Ok(None),
    }
}

fn list_child_ids(conn: &Connection, parent: Option<NodeId>) -> StoreResult<Vec<NodeId>> {
    let mut ids = Vec::new();
    match parent {
        Some(parent) => {
            let mut stmt = conn.prepare(
                "SELECT node_uuid
                 FROM nodes
                 WHERE parent_uuid = ?1
                   AND is_deleted = 0
                 ORDER BY sort_order ASC, node_uuid ASC;",
            )?;
            let mut rows = stmt.query([parent.to_string()])?;
            while let Some(row) = rows.next()? {
                let value: String = row.get(0)?;
                ids.push(parse_uuid(&value, "nodes.node_uuid")?);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT node_uuid
                 FROM nodes
                 WHERE parent_uuid IS NULL
                   AND is_deleted = 0
                 ORDER BY sort_order ASC, node_uuid ASC;",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let value: String = row.get(0)?;
                ids.push(parse_uuid(&value, "nodes.node_uuid")?);
            }
        }
    }
    Ok(ids)
}

fn next_sort_order(conn: &Connection, parent: Option<NodeId>) -> StoreResult<i64> {
    let next = match parent {
        Some(parent) => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM nodes
             WHERE parent_uuid = ?1
               AND is_deleted = 0;",
            [parent.to_string()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM nodes
             WHERE parent_uuid IS NULL
               AND is_deleted = 0;",
            [],
            |row| row.get(0),
        )?,
    };
    Ok(next)
}

fn ensure_id_unused(conn: &Connection, id: NodeId) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM nodes WHERE node_uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 1 {
        return Err(StoreError::DuplicateId(id));
    }
    Ok(())
}

fn ensure_active_folder(conn: &Connection, id: NodeId) -> StoreResult<()> {
    let kind: Option<String> = conn
        .query_row(
            "SELECT kind
             FROM nodes
             WHERE node_uuid = ?1
               AND is_deleted = 0;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match kind.as_deref() {
        None => Err(StoreError::NodeNotFound(id)),
        Some("folder") => Ok(()),
        Some(_) => Err(StoreError::NodeNotFolder(id)),
    }
}

fn replace_tags(conn: &Connection, id: NodeId, tags: &BTreeSet<String>) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM node_tags WHERE node_uuid = ?1;",
        [id.to_string()],
    )?;
    for tag in tags {
        conn.execute(
            "INSERT OR IGNORE INTO node_tags (node_uuid, tag) VALUES (?1, ?2);",
            params![id.to_string(), tag],
        )?;
    }
    Ok(())
}

fn load_tags(conn: &Connection, id: NodeId) -> StoreResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM node_tags
         WHERE node_uuid = ?1
         ORDER BY tag ASC;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut tags = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tags.insert(row.get::<_, String>(0)?);
    }
    Ok(tags)
}

fn load_all_tags(conn: &Connection) -> StoreResult<HashMap<NodeId, BTreeSet<String>>> {
    let mut stmt = conn.prepare(
        "SELECT t.node_uuid, t.tag
         FROM node_tags t
         INNER JOIN nodes n ON n.node_uuid = t.node_uuid
         WHERE n.is_deleted = 0;",
    )?;
    let mut rows = stmt.query([])?;
    let mut tags: HashMap<NodeId, BTreeSet<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let node_uuid: String = row.get(0)?;
        let id = parse_uuid(&node_uuid, "node_tags.node_uuid")?;
        tags.entry(id).or_default().insert(row.get(1)?);
    }
    Ok(tags)
}

fn parse_node_row(row: &Row<'_>) -> StoreResult<NodeRow> {
    let id_text: String = row.get("node_uuid")?;
    let id = parse_uuid(&id_text, "nodes.node_uuid")?;
    let parent = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "nodes.parent_uuid"))
        .transpose()?;

    let kind_text: String = row.get("kind")?;
    let kind = match kind_text.as_str() {
        "folder" => NodeKind::Folder,
        "item" => NodeKind::Item,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid node kind `{other}` in nodes.kind"
            )));
        }
    };
    let item_kind = row
        .get::<_, Option<String>>("item_kind")?
        .map(|value| {
            ItemKind::parse(&value).ok_or_else(|| {
                StoreError::InvalidData(format!("invalid item kind `{value}` in nodes.item_kind"))
            })
        })
        .transpose()?;

    Ok(NodeRow {
        id,
        kind,
        parent,
        name: row.get("name")?,
        item_kind,
        content: row.get("content")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    for table in ["nodes", "node_tags"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
