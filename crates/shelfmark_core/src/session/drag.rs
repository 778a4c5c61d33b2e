//! Drag-and-drop session state machine.
//!
//! # Responsibility
//! - Turn `drag_start` / `drag_over` / `drop` / `drag_cancel` events into
//!   live preview moves and one final move command.
//!
//! # Invariants
//! - At most one drag is active.
//! - Preview moves never refresh timestamps and are not persisted.
//! - When a drag ends the dragged node is back at its origin, so the final
//!   move command carries the true pre-drag position for rollback.
//! - Only folders are drop targets; items are never valid targets.
//! - Changes made outside the drag see the dragged node at its origin; the
//!   origin is re-read afterwards and the preview re-applied only if its
//!   target is still legal.

use crate::model::node::{Node, NodeId};
use crate::reconcile::command::Mutation;
use crate::tree::error::TreeError;
use crate::tree::forest::{Forest, Placement};
use crate::tree::guard;
use crate::tree::mutation;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Observable drag state.
///
/// `Committing` and `Cancelled` are reported through [`DragEnd`]; the session
/// is back in `Idle` when `drop`/`cancel` return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
    Hovering(NodeId),
}

/// Errors from out-of-order or invalid drag events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    /// `drag_start` while another drag is active.
    DragInProgress { active: NodeId },
    /// Hover/drop/cancel with no active drag.
    NoActiveDrag,
    /// Dragged node could not be located.
    Tree(TreeError),
}

impl Display for DragError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DragInProgress { active } => write!(f, "drag already active for node {active}"),
            Self::NoActiveDrag => write!(f, "no drag in progress"),
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DragError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for DragError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

/// Result of a `drag_over` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverOutcome {
    /// Candidate accepted; the preview now shows the node inside it.
    Previewed { target: NodeId },
    /// Candidate is not a legal drop target; the last preview stays.
    Rejected { candidate: NodeId },
}

/// How a drag ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEnd {
    /// Drop accepted; hand the move to the reconciler.
    Commit(Mutation),
    /// Preview discarded; node is back at its origin.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    node_id: NodeId,
    origin: Placement,
    origin_updated_at: i64,
    hovered: Option<NodeId>,
    preview: Option<NodeId>,
}

/// Sequencer for one pointer's drag gestures.
#[derive(Debug, Default)]
pub struct DragSession {
    active: Option<ActiveDrag>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        match self.active {
            None => DragState::Idle,
            Some(ActiveDrag {
                hovered: Some(target),
                ..
            }) => DragState::Hovering(target),
            Some(_) => DragState::Dragging,
        }
    }

    pub fn active_id(&self) -> Option<NodeId> {
        self.active.map(|drag| drag.node_id)
    }

    pub fn hovered_id(&self) -> Option<NodeId> {
        self.active.and_then(|drag| drag.hovered)
    }

    /// `Idle -> Dragging` on `node_id`.
    pub fn start(&mut self, forest: &Forest, node_id: NodeId) -> Result<(), DragError> {
        if let Some(active) = self.active {
            return Err(DragError::DragInProgress {
                active: active.node_id,
            });
        }
        let origin = forest.placement(node_id)?;
        let origin_updated_at = forest
            .get(node_id)
            .ok_or(TreeError::NotFound(node_id))?
            .updated_at();
        self.active = Some(ActiveDrag {
            node_id,
            origin,
            origin_updated_at,
            hovered: None,
            preview: None,
        });
        debug!("event=drag_start module=session status=ok node_id={node_id}");
        Ok(())
    }

    /// Records the hovered candidate and previews the move when legal.
    pub fn hover(&mut self, forest: &mut Forest, candidate: NodeId) -> Result<HoverOutcome, DragError> {
        let mut drag = self.active.ok_or(DragError::NoActiveDrag)?;
        if !forest.contains(drag.node_id) {
            self.active = None;
            return Err(TreeError::NotFound(drag.node_id).into());
        }
        drag.hovered = Some(candidate);

        let outcome = if is_valid_target(forest, drag.node_id, candidate) {
            if drag.preview != Some(candidate) {
                self.preview_into(forest, &drag, candidate)?;
                drag.preview = Some(candidate);
            }
            HoverOutcome::Previewed { target: candidate }
        } else {
            HoverOutcome::Rejected { candidate }
        };
        self.active = Some(drag);
        Ok(outcome)
    }

    /// Ends the drag on `target`.
    ///
    /// Commits to `target` when it is a legal drop target, otherwise to the
    /// last previewed folder; with neither, the drag is cancelled.
    pub fn drop(&mut self, forest: &mut Forest, target: NodeId) -> Result<DragEnd, DragError> {
        let drag = self.active.ok_or(DragError::NoActiveDrag)?;
        let destination = if drag.hovered.is_some()
            && forest.contains(drag.node_id)
            && is_valid_target(forest, drag.node_id, target)
        {
            Some(target)
        } else {
            drag.preview
        };

        self.restore_origin(forest, &drag);
        self.active = None;

        let Some(destination) = destination else {
            debug!(
                "event=drag_end module=session status=cancelled node_id={} reason=no_target",
                drag.node_id
            );
            return Ok(DragEnd::Cancelled);
        };

        let index = if Some(destination) == drag.origin.parent {
            Some(drag.origin.index)
        } else {
            None
        };
        debug!(
            "event=drag_end module=session status=commit node_id={} target_id={}",
            drag.node_id, destination
        );
        Ok(DragEnd::Commit(Mutation::Move {
            id: drag.node_id,
            target: Some(destination),
            index,
        }))
    }

    /// Discards the preview and returns the node to its pre-drag position.
    pub fn cancel(&mut self, forest: &mut Forest) -> Result<(), DragError> {
        let drag = self.active.take().ok_or(DragError::NoActiveDrag)?;
        self.restore_origin(forest, &drag);
        debug!(
            "event=drag_end module=session status=cancelled node_id={} reason=user",
            drag.node_id
        );
        Ok(())
    }

    /// Moves the dragged node back to its origin without ending the drag.
    ///
    /// Pair with [`DragSession::resume`] around any forest change that is not
    /// part of the drag itself.
    pub(crate) fn suspend(&mut self, forest: &mut Forest) {
        if let Some(drag) = self.active {
            self.restore_origin(forest, &drag);
        }
    }

    /// Takes the current position as the new origin and re-applies the
    /// preview when its target is still a legal drop target.
    ///
    /// Ends the drag when the dragged node no longer exists.
    pub(crate) fn resume(&mut self, forest: &mut Forest) {
        let Some(mut drag) = self.active else {
            return;
        };
        let snapshot = forest
            .placement(drag.node_id)
            .ok()
            .zip(forest.get(drag.node_id).map(Node::updated_at));
        let Some((origin, updated_at)) = snapshot else {
            self.active = None;
            debug!(
                "event=drag_end module=session status=cancelled node_id={} reason=node_removed",
                drag.node_id
            );
            return;
        };
        drag.origin = origin;
        drag.origin_updated_at = updated_at;

        if let Some(target) = drag.preview.take() {
            if is_valid_target(forest, drag.node_id, target) {
                match self.preview_into(forest, &drag, target) {
                    Ok(()) => drag.preview = Some(target),
                    Err(err) => warn!(
                        "event=drag_preview module=session status=error node_id={} target_id={} error_code={}",
                        drag.node_id,
                        target,
                        err.code()
                    ),
                }
            } else {
                debug!(
                    "event=drag_preview module=session status=dropped node_id={} target_id={}",
                    drag.node_id, target
                );
            }
        }
        if drag.hovered.is_some_and(|hovered| !forest.contains(hovered)) {
            drag.hovered = None;
        }
        self.active = Some(drag);
    }

    fn preview_into(&self, forest: &mut Forest, drag: &ActiveDrag, target: NodeId) -> Result<(), TreeError> {
        if Some(target) == drag.origin.parent {
            mutation::relocate(forest, drag.node_id, drag.origin.parent, Some(drag.origin.index))?;
        } else if forest.parent_of(drag.node_id)? != Some(target) {
            mutation::relocate(forest, drag.node_id, Some(target), None)?;
        }
        Ok(())
    }

    fn restore_origin(&self, forest: &mut Forest, drag: &ActiveDrag) {
        if drag.preview.is_none() || !forest.contains(drag.node_id) {
            return;
        }
        let restored = mutation::relocate(
            forest,
            drag.node_id,
            drag.origin.parent,
            Some(drag.origin.index),
        )
        .and_then(|_| mutation::set_updated_at(forest, drag.node_id, drag.origin_updated_at));
        if let Err(err) = restored {
            warn!(
                "event=drag_restore module=session status=error node_id={} error_code={}",
                drag.node_id,
                err.code()
            );
        }
    }
}

fn is_valid_target(forest: &Forest, node_id: NodeId, candidate: NodeId) -> bool {
    forest.folder(candidate).is_some() && guard::check_move(forest, node_id, Some(candidate)).is_ok()
}
