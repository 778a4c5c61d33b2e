//! Cycle guard for folder moves.
//!
//! # Invariants
//! - A folder is never placed under itself or any of its descendants.
//! - Guard checks never mutate the forest.

use crate::model::node::NodeId;
use crate::tree::error::{TreeError, TreeResult};
use crate::tree::forest::Forest;
use std::collections::HashSet;

/// Returns whether `candidate` sits strictly beneath `ancestor`.
///
/// Walks the parent chain upward from `candidate`, which visits the same
/// relation as a downward subtree scan in O(depth). Unknown ids yield `false`.
pub fn is_descendant(forest: &Forest, ancestor: NodeId, candidate: NodeId) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = forest.parent_of(candidate).ok().flatten();
    while let Some(current) = cursor {
        if current == ancestor {
            return true;
        }
        if !visited.insert(current) {
            // Corrupt parent chain; treat as unsafe.
            return true;
        }
        cursor = forest.parent_of(current).ok().flatten();
    }
    false
}

/// Vetoes a move of `node` under `target` when it would create a cycle.
///
/// Items cannot contain folders, so only self-moves are checked for them.
pub fn check_move(forest: &Forest, node: NodeId, target: Option<NodeId>) -> TreeResult<()> {
    let Some(target) = target else {
        return Ok(());
    };
    if target == node {
        return Err(TreeError::CycleRejected { node, target });
    }
    let moving_folder = forest
        .get(node)
        .ok_or(TreeError::NotFound(node))?
        .is_folder();
    if moving_folder && is_descendant(forest, node, target) {
        return Err(TreeError::CycleRejected { node, target });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_move, is_descendant};
    use crate::model::node::Folder;
    use crate::tree::error::TreeError;
    use crate::tree::forest::Forest;
    use crate::tree::mutation::create_folder;

    #[test]
    fn descendant_relation_is_strict_and_transitive() {
        let mut forest = Forest::new();
        let a = Folder::new("A");
        let b = Folder::new("B");
        let d = Folder::new("D");
        let (a_id, b_id, d_id) = (a.id, b.id, d.id);
        create_folder(&mut forest, a, None).unwrap();
        create_folder(&mut forest, b, Some(a_id)).unwrap();
        create_folder(&mut forest, d, Some(b_id)).unwrap();

        assert!(is_descendant(&forest, a_id, d_id));
        assert!(is_descendant(&forest, b_id, d_id));
        assert!(!is_descendant(&forest, d_id, a_id));
        assert!(!is_descendant(&forest, a_id, a_id));
    }

    #[test]
    fn check_move_rejects_self_and_descendant_targets() {
        let mut forest = Forest::new();
        let a = Folder::new("A");
        let b = Folder::new("B");
        let (a_id, b_id) = (a.id, b.id);
        create_folder(&mut forest, a, None).unwrap();
        create_folder(&mut forest, b, Some(a_id)).unwrap();

        assert_eq!(
            check_move(&forest, a_id, Some(a_id)),
            Err(TreeError::CycleRejected {
                node: a_id,
                target: a_id
            })
        );
        assert_eq!(
            check_move(&forest, a_id, Some(b_id)),
            Err(TreeError::CycleRejected {
                node: a_id,
                target: b_id
            })
        );
        assert_eq!(check_move(&forest, b_id, None), Ok(()));
    }
}
