//! Persistence adapter contract and the timed persist call.
//!
//! # Responsibility
//! - Define the narrow async interface the external store implements.
//! - Dispatch one pending request with a caller-defined timeout.
//!
//! # Invariants
//! - `persist` never touches the forest; its outcome is applied by `settle`.
//! - Any rejection, including timeout, is reported uniformly as a failure.

use crate::model::node::{Folder, Item, Node, NodeId};
use crate::reconcile::command::{MutationId, NodePatch, PendingPersist, PersistRequest};
use async_trait::async_trait;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Result type used by adapter calls.
pub type PersistResult<T> = Result<T, PersistenceError>;

/// Failure reported by a persistence adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Store unreachable or I/O failed.
    Transport(String),
    /// Store refused the change.
    Validation(String),
    /// Call did not resolve within the configured timeout.
    Timeout(Duration),
}

impl PersistenceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Validation(_) => "validation",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "store transport failed: {message}"),
            Self::Validation(message) => write!(f, "store rejected change: {message}"),
            Self::Timeout(after) => {
                write!(f, "store did not respond within {} ms", after.as_millis())
            }
        }
    }
}

impl Error for PersistenceError {}

/// Narrow interface to the durable store.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Creates one folder under optional parent.
    async fn create_folder(
        &self,
        folder: &Folder,
        parent_id: Option<NodeId>,
    ) -> PersistResult<Folder>;
    /// Creates one item inside a folder.
    async fn create_item(&self, folder_id: NodeId, item: &Item) -> PersistResult<Item>;
    /// Applies a move/rename/content patch.
    async fn update_node(&self, id: NodeId, patch: &NodePatch) -> PersistResult<Node>;
    /// Deletes a folder recursively or a single item.
    async fn delete_node(&self, id: NodeId) -> PersistResult<()>;
}

/// Outcome of one persist call, to be fed back into `settle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub mutation_id: MutationId,
    pub result: PersistResult<()>,
}

impl PersistOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Sends one pending request to `adapter`, treating expiry of `timeout` as a
/// failure.
///
/// Borrows only the adapter and the ticket, so several calls may be in flight
/// while the caller keeps mutating the forest.
pub async fn persist<A>(adapter: &A, pending: &PendingPersist, timeout: Duration) -> PersistOutcome
where
    A: PersistenceAdapter + ?Sized,
{
    let started_at = Instant::now();
    let result = match tokio::time::timeout(timeout, dispatch(adapter, &pending.request)).await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::Timeout(timeout)),
    };

    match &result {
        Ok(()) => info!(
            "event=persist module=reconcile status=ok mutation_id={} op={} node_id={} duration_ms={}",
            pending.mutation_id,
            pending.request.op(),
            pending.node_id,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event=persist module=reconcile status=error mutation_id={} op={} node_id={} duration_ms={} error_code={} error={}",
            pending.mutation_id,
            pending.request.op(),
            pending.node_id,
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
    }

    PersistOutcome {
        mutation_id: pending.mutation_id,
        result,
    }
}

async fn dispatch<A>(adapter: &A, request: &PersistRequest) -> PersistResult<()>
where
    A: PersistenceAdapter + ?Sized,
{
    match request {
        PersistRequest::CreateFolder { folder, parent_id } => {
            adapter.create_folder(folder, *parent_id).await.map(|_| ())
        }
        PersistRequest::CreateItem { folder_id, item } => {
            adapter.create_item(*folder_id, item).await.map(|_| ())
        }
        PersistRequest::UpdateNode { id, patch } => {
            adapter.update_node(*id, patch).await.map(|_| ())
        }
        PersistRequest::DeleteNode { id } => adapter.delete_node(*id).await,
    }
}
