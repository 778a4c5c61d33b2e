//! Property tests: random mutation, drag and settle sequences keep the forest
//! a valid forest (unique ids, no cycles, consistent parent links) and never
//! lose a confirmed node that was not deleted.

use proptest::prelude::*;
use shelfmark_core::tree::guard::is_descendant;
use shelfmark_core::tree::mutation::{create_folder, move_node};
use shelfmark_core::{
    EngineConfig, Folder, Forest, ItemKind, MutationKind, Node, NodeId, PendingPersist,
    PersistOutcome, PersistenceError, TreeError, Workspace,
};
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    CreateFolder { parent: Option<usize> },
    CreateItem { folder: usize },
    Move { node: usize, target: Option<usize>, index: Option<usize> },
    Rename { node: usize },
    Delete { node: usize },
    DragStart { node: usize },
    DragOver { target: usize },
    Drop { target: usize },
    DragCancel,
    Settle { ticket: usize, ok: bool },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => proptest::option::of(0usize..64).prop_map(|parent| Op::CreateFolder { parent }),
        2 => (0usize..64).prop_map(|folder| Op::CreateItem { folder }),
        4 => (0usize..64, proptest::option::of(0usize..64), proptest::option::of(0usize..8))
            .prop_map(|(node, target, index)| Op::Move { node, target, index }),
        1 => (0usize..64).prop_map(|node| Op::Rename { node }),
        1 => (0usize..64).prop_map(|node| Op::Delete { node }),
        2 => (0usize..64).prop_map(|node| Op::DragStart { node }),
        3 => (0usize..64).prop_map(|target| Op::DragOver { target }),
        1 => (0usize..64).prop_map(|target| Op::Drop { target }),
        1 => Just(Op::DragCancel),
        4 => (0usize..64, any::<bool>()).prop_map(|(ticket, ok)| Op::Settle { ticket, ok }),
    ]
}

fn pick(ids: &[NodeId], index: usize) -> Option<NodeId> {
    (!ids.is_empty()).then(|| ids[index % ids.len()])
}

/// Workspace plus the bookkeeping needed to check what must survive.
struct Session {
    ws: Workspace,
    pending: Vec<PendingPersist>,
    confirmed: HashSet<NodeId>,
    deleted: HashSet<NodeId>,
}

impl Session {
    fn new() -> Self {
        let mut ws = Workspace::new(EngineConfig::default());
        let seed = ws.create_folder("seed", None).unwrap();
        Self {
            ws,
            pending: vec![seed],
            confirmed: HashSet::new(),
            deleted: HashSet::new(),
        }
    }

    fn ids(&self) -> HashSet<NodeId> {
        self.ws.forest().walk().map(Node::id).collect()
    }

    fn run(&mut self, op: &Op) {
        let before = self.ids();
        let ticket = self.dispatch(op);
        if let Some(ticket) = ticket {
            if matches!(ticket.kind, MutationKind::Delete) {
                let after = self.ids();
                self.deleted.extend(before.difference(&after).copied());
            }
            self.pending.push(ticket);
        }
    }

    fn dispatch(&mut self, op: &Op) -> Option<PendingPersist> {
        if let Op::Settle { ticket, ok } = *op {
            if !self.pending.is_empty() {
                let ticket = self.pending.remove(ticket % self.pending.len());
                self.settle(&ticket, ok);
            }
            return None;
        }

        let ws = &mut self.ws;
        let ids: Vec<NodeId> = ws.forest().walk().map(Node::id).collect();
        let folders: Vec<NodeId> = ws
            .forest()
            .walk()
            .filter(|node| node.is_folder())
            .map(Node::id)
            .collect();
        let result = match *op {
            Op::CreateFolder { parent } => {
                let parent = parent.and_then(|index| pick(&folders, index));
                ws.create_folder("folder", parent)
            }
            Op::CreateItem { folder } => {
                let folder = pick(&folders, folder)?;
                ws.create_item(folder, ItemKind::Note, "item", "")
            }
            Op::Move { node, target, index } => {
                let node = pick(&ids, node)?;
                let target = target.and_then(|index| pick(&ids, index));
                ws.move_node(node, target, index)
            }
            Op::Rename { node } => ws.rename(pick(&ids, node)?, "renamed"),
            Op::Delete { node } => ws.delete(pick(&ids, node)?),
            Op::DragStart { node } => {
                let _ = ws.drag_start(pick(&ids, node)?);
                return None;
            }
            Op::DragOver { target } => {
                let _ = ws.drag_over(pick(&ids, target)?);
                return None;
            }
            Op::Drop { target } => return ws.drop(pick(&ids, target)?).ok().flatten(),
            Op::DragCancel => {
                let _ = ws.drag_cancel();
                return None;
            }
            Op::Settle { .. } => return None,
        };
        result.ok()
    }

    fn settle(&mut self, ticket: &PendingPersist, ok: bool) {
        let result = if ok {
            Ok(())
        } else {
            Err(PersistenceError::Transport("offline".to_string()))
        };
        self.ws.settle(PersistOutcome {
            mutation_id: ticket.mutation_id,
            result,
        });
        let created = matches!(ticket.kind, MutationKind::CreateFolder | MutationKind::CreateItem);
        if ok && created {
            self.confirmed.insert(ticket.node_id);
        }
    }

    fn check(&self) {
        assert_valid_forest(self.ws.forest());
        for id in self.confirmed.difference(&self.deleted) {
            assert!(self.ws.forest().contains(*id), "confirmed node {id} disappeared");
        }
    }
}

fn assert_valid_forest(forest: &Forest) {
    let walked: Vec<NodeId> = forest.walk().map(Node::id).collect();
    let unique: HashSet<NodeId> = walked.iter().copied().collect();
    assert_eq!(unique.len(), walked.len(), "duplicate id in walk");
    assert_eq!(walked.len(), forest.len(), "unreachable or missing nodes");

    for root in forest.roots() {
        assert!(forest.get(*root).is_some_and(Node::is_folder));
    }
    for id in walked {
        let parent = forest.parent_of(id).unwrap();
        assert!(forest.children(parent).unwrap().contains(&id), "{id} missing from parent");

        let mut steps = 0;
        let mut cursor = parent;
        while let Some(parent) = cursor {
            steps += 1;
            assert!(steps <= forest.len(), "cycle above {id}");
            cursor = forest.parent_of(parent).unwrap();
        }
        if let Some(item) = forest.item(id) {
            assert_eq!(forest.parent_of(id).unwrap(), Some(item.parent_folder_id));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_sessions_keep_forest_valid(
        ops in prop::collection::vec(arb_op(), 1..60),
        verdicts in prop::collection::vec(any::<bool>(), 40),
        settle_reversed in any::<bool>(),
    ) {
        let mut session = Session::new();
        for op in &ops {
            session.run(op);
            session.check();
        }

        let mut rest = std::mem::take(&mut session.pending);
        if settle_reversed {
            rest.reverse();
        }
        for (ticket, ok) in rest.iter().zip(verdicts.iter().cycle()) {
            session.settle(ticket, *ok);
            session.check();
        }
        let _ = session.ws.drag_cancel();
        session.check();
        prop_assert_eq!(session.ws.in_flight_len(), 0);
    }

    #[test]
    fn moves_into_own_subtree_are_always_rejected(depth in 1usize..8, pick_at in 0usize..8) {
        let mut forest = Forest::new();
        let mut chain = Vec::new();
        let mut parent = None;
        for _ in 0..=depth {
            let folder = Folder::new("level");
            let id = folder.id;
            create_folder(&mut forest, folder, parent).unwrap();
            chain.push(id);
            parent = Some(id);
        }
        let before = forest.clone();
        let target = chain[(pick_at % depth) + 1];

        let ancestors: Vec<NodeId> = chain
            .iter()
            .copied()
            .filter(|id| is_descendant(&forest, *id, target))
            .collect();
        prop_assert!(!ancestors.is_empty());
        for ancestor in ancestors {
            let err = move_node(&mut forest, ancestor, Some(target), None).unwrap_err();
            let is_cycle = matches!(err, TreeError::CycleRejected { .. });
            prop_assert!(is_cycle);
        }
        prop_assert_eq!(&forest, &before);
    }
}
