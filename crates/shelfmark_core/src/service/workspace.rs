//! Workspace session facade.
//!
//! # Responsibility
//! - Own one forest together with its drag session and reconciler.
//! - Expose user-level operations that commit optimistically and hand back
//!   the persistence ticket.
//! - Collect persistence notices for the UI.
//!
//! # Invariants
//! - Every forest change outside a drag preview goes through the reconciler.
//! - Notices are kept in settle order until taken.
//! - Commits and settles never see a drag preview: the dragged node is put
//!   back at its origin first and the preview re-applied afterwards.

use crate::config::EngineConfig;
use crate::model::node::{Folder, Item, ItemKind, NodeId};
use crate::model::view::{forest_view, Projection};
use crate::reconcile::adapter::{persist, PersistOutcome, PersistenceAdapter};
use crate::reconcile::command::{Mutation, PendingPersist};
use crate::reconcile::reconciler::{PersistenceNotice, Reconciler};
use crate::session::drag::{DragEnd, DragError, DragSession, DragState, HoverOutcome};
use crate::tree::error::TreeError;
use crate::tree::forest::Forest;
use crate::tree::mutation::{FolderStyle, ItemEdit};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Result type used by workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Errors from workspace operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    /// Mutation rejected by the tree engine.
    Tree(TreeError),
    /// Drag event out of order or invalid.
    Drag(DragError),
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Drag(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Drag(err) => Some(err),
        }
    }
}

impl From<TreeError> for WorkspaceError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<DragError> for WorkspaceError {
    fn from(value: DragError) -> Self {
        match value {
            DragError::Tree(err) => Self::Tree(err),
            other => Self::Drag(other),
        }
    }
}

/// One editing session over a folder/item forest.
#[derive(Debug, Default)]
pub struct Workspace {
    forest: Forest,
    drag: DragSession,
    reconciler: Reconciler,
    notices: Vec<PersistenceNotice>,
    config: EngineConfig,
}

impl Workspace {
    /// Starts an empty workspace.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_forest(Forest::new(), config)
    }

    /// Starts a workspace over an already hydrated forest.
    pub fn with_forest(forest: Forest, config: EngineConfig) -> Self {
        info!(
            "event=workspace_open module=service status=ok nodes={} roots={}",
            forest.len(),
            forest.roots().len()
        );
        Self {
            forest,
            drag: DragSession::new(),
            reconciler: Reconciler::new(),
            notices: Vec::new(),
            config,
        }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn persist_timeout(&self) -> Duration {
        self.config.persist_timeout()
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    /// Number of mutations still waiting for the store.
    pub fn in_flight_len(&self) -> usize {
        self.reconciler.in_flight_len()
    }

    /// Commits one mutation optimistically.
    pub fn apply(&mut self, mutation: Mutation) -> WorkspaceResult<PendingPersist> {
        self.drag.suspend(&mut self.forest);
        let committed = self.reconciler.commit(&mut self.forest, mutation);
        self.drag.resume(&mut self.forest);
        Ok(committed?)
    }

    /// Creates an empty folder appended under `parent`.
    pub fn create_folder(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
    ) -> WorkspaceResult<PendingPersist> {
        self.apply(Mutation::CreateFolder {
            folder: Folder::new(name),
            parent,
        })
    }

    /// Creates an item appended to `folder`.
    pub fn create_item(
        &mut self,
        folder: NodeId,
        kind: ItemKind,
        name: &str,
        content: &str,
    ) -> WorkspaceResult<PendingPersist> {
        self.apply(Mutation::CreateItem {
            item: Item::new(kind, name, content),
            folder,
        })
    }

    pub fn move_node(
        &mut self,
        id: NodeId,
        target: Option<NodeId>,
        index: Option<usize>,
    ) -> WorkspaceResult<PendingPersist> {
        self.apply(Mutation::Move { id, target, index })
    }

    pub fn rename(&mut self, id: NodeId, name: &str) -> WorkspaceResult<PendingPersist> {
        self.apply(Mutation::Rename {
            id,
            name: name.to_string(),
        })
    }

    pub fn edit_item(&mut self, id: NodeId, edit: ItemEdit) -> WorkspaceResult<PendingPersist> {
        self.apply(Mutation::EditItem { id, edit })
    }

    pub fn style_folder(
        &mut self,
        id: NodeId,
        style: FolderStyle,
    ) -> WorkspaceResult<PendingPersist> {
        self.apply(Mutation::StyleFolder { id, style })
    }

    pub fn delete(&mut self, id: NodeId) -> WorkspaceResult<PendingPersist> {
        self.apply(Mutation::Delete { id })
    }

    pub fn drag_start(&mut self, id: NodeId) -> WorkspaceResult<()> {
        Ok(self.drag.start(&self.forest, id)?)
    }

    pub fn drag_over(&mut self, candidate: NodeId) -> WorkspaceResult<HoverOutcome> {
        Ok(self.drag.hover(&mut self.forest, candidate)?)
    }

    /// Ends the drag on `target`.
    ///
    /// Returns the persistence ticket for the committed move, or `None` when
    /// the drop had no legal destination and the drag was cancelled.
    pub fn drop(&mut self, target: NodeId) -> WorkspaceResult<Option<PendingPersist>> {
        match self.drag.drop(&mut self.forest, target)? {
            DragEnd::Commit(mutation) => self.apply(mutation).map(Some),
            DragEnd::Cancelled => Ok(None),
        }
    }

    pub fn drag_cancel(&mut self) -> WorkspaceResult<()> {
        Ok(self.drag.cancel(&mut self.forest)?)
    }

    /// Applies a persistence outcome and records any resulting notice.
    pub fn settle(&mut self, outcome: PersistOutcome) -> Option<PersistenceNotice> {
        self.drag.suspend(&mut self.forest);
        let notice = self.reconciler.settle(&mut self.forest, outcome);
        self.drag.resume(&mut self.forest);

        let notice = notice?;
        self.notices.push(notice.clone());
        Some(notice)
    }

    /// Persists `pending` through `adapter` and settles the outcome.
    pub async fn sync<A>(&mut self, adapter: &A, pending: &PendingPersist) -> Option<PersistenceNotice>
    where
        A: PersistenceAdapter + ?Sized,
    {
        let outcome = persist(adapter, pending, self.persist_timeout()).await;
        self.settle(outcome)
    }

    /// Drains notices collected since the last call.
    pub fn take_notices(&mut self) -> Vec<PersistenceNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Renderable snapshot of the forest and drag highlight.
    pub fn projection(&self) -> Projection {
        Projection {
            tree: forest_view(&self.forest),
            active_drag_id: self.drag.active_id(),
            hovered_target_id: self.drag.hovered_id(),
        }
    }
}
