//! Optimistic commit log with scoped rollback.
//!
//! # Responsibility
//! - Apply mutations to the local forest immediately.
//! - Keep one undo record per in-flight mutation.
//! - On persistence failure, restore only the nodes that mutation touched.
//!
//! # Invariants
//! - In-flight records are keyed by `MutationId`, never by node id.
//! - A failure never reverts a node that a later mutation has touched since.
//! - Settling an unknown or already-settled mutation is a logged no-op.

use crate::model::node::{Node, NodeId};
use crate::reconcile::adapter::{PersistOutcome, PersistenceError};
use crate::reconcile::command::{
    Mutation, MutationId, MutationKind, NodePatch, PendingPersist, PersistRequest,
};
use crate::tree::error::{TreeError, TreeResult};
use crate::tree::forest::{Forest, Placement};
use crate::tree::guard;
use crate::tree::mutation::{self, Detached};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// User-visible signal raised when a mutation could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceNotice {
    pub mutation_id: MutationId,
    pub kind: MutationKind,
    pub node_id: NodeId,
    /// Nodes restored to their pre-mutation state.
    pub reverted: Vec<NodeId>,
    /// Nodes left alone because a later mutation changed them.
    pub superseded: Vec<NodeId>,
    pub message: String,
}

#[derive(Debug)]
enum Undo {
    /// Undo a create: remove the node again.
    Remove { id: NodeId },
    /// Undo a move: put the node back and restore its timestamp.
    Relocate {
        id: NodeId,
        placement: Placement,
        updated_at: i64,
    },
    /// Undo a rename/edit/style change.
    RestoreFields { before: Node },
    /// Undo a delete: re-attach the detached subtree where it was.
    Reinsert { detached: Detached },
}

#[derive(Debug)]
struct InFlight {
    kind: MutationKind,
    node_id: NodeId,
    undo: Undo,
}

struct Applied {
    undo: Undo,
    touched: Vec<NodeId>,
    request: PersistRequest,
}

/// Tracks optimistic mutations until the store confirms or rejects them.
#[derive(Debug, Default)]
pub struct Reconciler {
    next_id: u64,
    in_flight: BTreeMap<MutationId, InFlight>,
    /// Latest in-flight-relevant mutation that touched each node.
    last_touch: HashMap<NodeId, MutationId>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutations awaiting a persistence outcome.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, mutation_id: MutationId) -> bool {
        self.in_flight.contains_key(&mutation_id)
    }

    /// Applies `mutation` to `forest` now and records how to undo it.
    ///
    /// # Errors
    /// Returns the tree error unchanged; the forest is left untouched and no
    /// record is kept.
    pub fn commit(&mut self, forest: &mut Forest, mutation: Mutation) -> TreeResult<PendingPersist> {
        let kind = mutation.kind();
        let node_id = mutation.subject();
        let applied = match apply(forest, mutation) {
            Ok(applied) => applied,
            Err(err) => {
                log_rejection(kind, node_id, &err);
                return Err(err);
            }
        };

        self.next_id += 1;
        let mutation_id = MutationId(self.next_id);
        for touched in &applied.touched {
            self.last_touch.insert(*touched, mutation_id);
        }
        self.in_flight.insert(
            mutation_id,
            InFlight {
                kind,
                node_id,
                undo: applied.undo,
            },
        );
        info!(
            "event=mutation_commit module=reconcile status=ok mutation_id={} kind={} node_id={} in_flight={}",
            mutation_id,
            kind.as_str(),
            node_id,
            self.in_flight.len()
        );

        Ok(PendingPersist {
            mutation_id,
            kind,
            node_id,
            request: applied.request,
        })
    }

    /// Applies a persistence outcome.
    ///
    /// Success drops the undo record. Failure reverts the mutation's nodes
    /// (unless superseded) and returns the notice to show the user.
    pub fn settle(&mut self, forest: &mut Forest, outcome: PersistOutcome) -> Option<PersistenceNotice> {
        let Some(record) = self.in_flight.remove(&outcome.mutation_id) else {
            warn!(
                "event=mutation_settle module=reconcile status=ignored mutation_id={} reason=unknown_mutation",
                outcome.mutation_id
            );
            return None;
        };

        let notice = match outcome.result {
            Ok(()) => {
                debug!(
                    "event=mutation_settle module=reconcile status=ok mutation_id={} kind={}",
                    outcome.mutation_id,
                    record.kind.as_str()
                );
                None
            }
            Err(err) => Some(self.revert(forest, outcome.mutation_id, record, &err)),
        };
        self.prune_last_touch();
        notice
    }

    fn revert(
        &self,
        forest: &mut Forest,
        mutation_id: MutationId,
        record: InFlight,
        cause: &PersistenceError,
    ) -> PersistenceNotice {
        let scope = match &record.undo {
            Undo::Remove { id } => forest.subtree_ids(*id).unwrap_or_default(),
            Undo::Relocate { id, .. } => vec![*id],
            Undo::RestoreFields { before } => vec![before.id()],
            Undo::Reinsert { detached } => detached.subtree.ids().collect(),
        };
        let superseded: Vec<NodeId> = scope
            .iter()
            .copied()
            .filter(|id| {
                self.last_touch
                    .get(id)
                    .is_some_and(|toucher| *toucher > mutation_id)
            })
            .collect();

        let reverted = if superseded.is_empty() {
            match undo(forest, record.undo) {
                Ok(reverted) => reverted,
                Err(err) => {
                    warn!(
                        "event=mutation_revert module=reconcile status=error mutation_id={} node_id={} error_code={}",
                        mutation_id,
                        record.node_id,
                        err.code()
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        warn!(
            "event=mutation_revert module=reconcile status=ok mutation_id={} kind={} node_id={} reverted={} superseded={} cause={}",
            mutation_id,
            record.kind.as_str(),
            record.node_id,
            reverted.len(),
            superseded.len(),
            cause.code()
        );

        PersistenceNotice {
            mutation_id,
            kind: record.kind,
            node_id: record.node_id,
            reverted,
            superseded,
            message: format!("could not save {}: {cause}", record.kind.as_str()),
        }
    }

    /// Keeps only touch marks that can still supersede an in-flight record.
    fn prune_last_touch(&mut self) {
        match self.in_flight.keys().next().copied() {
            None => self.last_touch.clear(),
            Some(oldest) => self.last_touch.retain(|_, toucher| *toucher >= oldest),
        }
    }
}

fn apply(forest: &mut Forest, mutation: Mutation) -> TreeResult<Applied> {
    match mutation {
        Mutation::CreateFolder { folder, parent } => {
            let id = folder.id;
            mutation::create_folder(forest, folder, parent)?;
            let folder = forest.folder(id).cloned().ok_or(TreeError::NotFound(id))?;
            Ok(Applied {
                undo: Undo::Remove { id },
                touched: vec![id],
                request: PersistRequest::CreateFolder {
                    folder,
                    parent_id: parent,
                },
            })
        }
        Mutation::CreateItem { item, folder } => {
            let id = item.id;
            mutation::create_item(forest, item, folder)?;
            let item = forest.item(id).cloned().ok_or(TreeError::NotFound(id))?;
            Ok(Applied {
                undo: Undo::Remove { id },
                touched: vec![id],
                request: PersistRequest::CreateItem {
                    folder_id: folder,
                    item,
                },
            })
        }
        Mutation::Move { id, target, index } => {
            let updated_at = forest.get(id).ok_or(TreeError::NotFound(id))?.updated_at();
            let outcome = mutation::move_node(forest, id, target, index)?;
            Ok(Applied {
                undo: Undo::Relocate {
                    id,
                    placement: outcome.from,
                    updated_at,
                },
                touched: vec![id],
                request: PersistRequest::UpdateNode {
                    id,
                    patch: NodePatch {
                        parent_id: Some(outcome.to.parent),
                        index: Some(outcome.to.index),
                        ..NodePatch::default()
                    },
                },
            })
        }
        Mutation::Rename { id, name } => {
            let before = forest.get(id).cloned().ok_or(TreeError::NotFound(id))?;
            mutation::rename(forest, id, &name)?;
            let name = forest.get(id).map(|node| node.name().to_string());
            Ok(Applied {
                undo: Undo::RestoreFields { before },
                touched: vec![id],
                request: PersistRequest::UpdateNode {
                    id,
                    patch: NodePatch {
                        name,
                        ..NodePatch::default()
                    },
                },
            })
        }
        Mutation::EditItem { id, edit } => {
            let before = forest.get(id).cloned().ok_or(TreeError::NotFound(id))?;
            mutation::edit_item(forest, id, &edit)?;
            let item = forest.item(id).ok_or(TreeError::NotAnItem(id))?;
            let patch = NodePatch {
                content: edit.content.as_ref().map(|_| item.content.clone()),
                kind: edit.kind.map(|_| item.kind),
                tags: edit.tags.as_ref().map(|_| item.tags.clone()),
                ..NodePatch::default()
            };
            Ok(Applied {
                undo: Undo::RestoreFields { before },
                touched: vec![id],
                request: PersistRequest::UpdateNode { id, patch },
            })
        }
        Mutation::StyleFolder { id, style } => {
            let before = forest.get(id).cloned().ok_or(TreeError::NotFound(id))?;
            mutation::set_folder_style(forest, id, &style)?;
            Ok(Applied {
                undo: Undo::RestoreFields { before },
                touched: vec![id],
                request: PersistRequest::UpdateNode {
                    id,
                    patch: NodePatch {
                        color: Some(style.color),
                        icon: Some(style.icon),
                        ..NodePatch::default()
                    },
                },
            })
        }
        Mutation::Delete { id } => {
            let detached = mutation::delete(forest, id)?;
            Ok(Applied {
                touched: detached.subtree.ids().collect(),
                undo: Undo::Reinsert { detached },
                request: PersistRequest::DeleteNode { id },
            })
        }
    }
}

fn undo(forest: &mut Forest, undo: Undo) -> TreeResult<Vec<NodeId>> {
    match undo {
        Undo::Remove { id } => {
            if !forest.contains(id) {
                return Ok(Vec::new());
            }
            let detached = mutation::delete(forest, id)?;
            Ok(detached.subtree.ids().collect())
        }
        Undo::Relocate {
            id,
            placement,
            updated_at,
        } => {
            guard::check_move(forest, id, placement.parent)?;
            mutation::relocate(forest, id, placement.parent, Some(placement.index))?;
            mutation::set_updated_at(forest, id, updated_at)?;
            Ok(vec![id])
        }
        Undo::RestoreFields { before } => {
            mutation::restore_fields(forest, &before)?;
            Ok(vec![before.id()])
        }
        Undo::Reinsert { detached } => {
            let ids = detached.subtree.ids().collect();
            mutation::attach(
                forest,
                detached.subtree,
                detached.origin.parent,
                Some(detached.origin.index),
            )?;
            Ok(ids)
        }
    }
}

fn log_rejection(kind: MutationKind, node_id: NodeId, err: &TreeError) {
    match err {
        TreeError::NotFound(_) | TreeError::DuplicateId(_) => error!(
            "event=mutation_commit module=reconcile status=error kind={} node_id={} error_code={} error={}",
            kind.as_str(),
            node_id,
            err.code(),
            err
        ),
        TreeError::CycleRejected { .. } => debug!(
            "event=mutation_commit module=reconcile status=rejected kind={} node_id={} error_code={}",
            kind.as_str(),
            node_id,
            err.code()
        ),
        _ => warn!(
            "event=mutation_commit module=reconcile status=rejected kind={} node_id={} error_code={}",
            kind.as_str(),
            node_id,
            err.code()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::Reconciler;
    use crate::model::node::{Folder, Item, ItemKind};
    use crate::reconcile::adapter::{PersistOutcome, PersistenceError};
    use crate::reconcile::command::{Mutation, MutationId, PersistRequest};
    use crate::tree::forest::Forest;

    fn fail(mutation_id: MutationId) -> PersistOutcome {
        PersistOutcome {
            mutation_id,
            result: Err(PersistenceError::Transport("offline".to_string())),
        }
    }

    #[test]
    fn mutation_ids_are_monotonic_and_requests_match_kind() {
        let mut forest = Forest::new();
        let mut reconciler = Reconciler::new();
        let folder = Folder::new("Inbox");
        let folder_id = folder.id;

        let first = reconciler
            .commit(
                &mut forest,
                Mutation::CreateFolder {
                    folder,
                    parent: None,
                },
            )
            .unwrap();
        let second = reconciler
            .commit(
                &mut forest,
                Mutation::Rename {
                    id: folder_id,
                    name: "Reading".to_string(),
                },
            )
            .unwrap();

        assert!(second.mutation_id > first.mutation_id);
        assert!(matches!(first.request, PersistRequest::CreateFolder { .. }));
        assert!(matches!(
            second.request,
            PersistRequest::UpdateNode { ref patch, .. } if patch.name.as_deref() == Some("Reading")
        ));
        assert_eq!(reconciler.in_flight_len(), 2);
    }

    #[test]
    fn rejected_commit_keeps_no_record() {
        let mut forest = Forest::new();
        let mut reconciler = Reconciler::new();
        let orphan = Item::new(ItemKind::Note, "x", "");
        let missing = uuid::Uuid::new_v4();

        assert!(reconciler
            .commit(
                &mut forest,
                Mutation::CreateItem {
                    item: orphan,
                    folder: missing,
                },
            )
            .is_err());
        assert_eq!(reconciler.in_flight_len(), 0);
        assert!(forest.is_empty());
    }

    #[test]
    fn failed_rename_restores_previous_name() {
        let mut forest = Forest::new();
        let mut reconciler = Reconciler::new();
        let folder = Folder::new("Inbox");
        let folder_id = folder.id;
        let created = reconciler
            .commit(
                &mut forest,
                Mutation::CreateFolder {
                    folder,
                    parent: None,
                },
            )
            .unwrap();
        reconciler.settle(
            &mut forest,
            PersistOutcome {
                mutation_id: created.mutation_id,
                result: Ok(()),
            },
        );

        let renamed = reconciler
            .commit(
                &mut forest,
                Mutation::Rename {
                    id: folder_id,
                    name: "Later".to_string(),
                },
            )
            .unwrap();
        let notice = reconciler
            .settle(&mut forest, fail(renamed.mutation_id))
            .expect("failure should raise a notice");

        assert_eq!(notice.reverted, vec![folder_id]);
        assert_eq!(forest.folder(folder_id).unwrap().name, "Inbox");
        assert_eq!(reconciler.in_flight_len(), 0);
    }

    #[test]
    fn settling_twice_is_ignored() {
        let mut forest = Forest::new();
        let mut reconciler = Reconciler::new();
        let pending = reconciler
            .commit(
                &mut forest,
                Mutation::CreateFolder {
                    folder: Folder::new("Inbox"),
                    parent: None,
                },
            )
            .unwrap();

        assert!(reconciler
            .settle(&mut forest, fail(pending.mutation_id))
            .is_some());
        assert!(reconciler
            .settle(&mut forest, fail(pending.mutation_id))
            .is_none());
        assert!(forest.is_empty());
    }
}
