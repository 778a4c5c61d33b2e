use async_trait::async_trait;
use shelfmark_core::{
    persist, EngineConfig, Folder, Item, ItemKind, Node, NodeId, NodePatch, PersistResult,
    PersistenceAdapter, PersistenceError, Workspace,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory adapter that fails for selected node ids and can stall.
#[derive(Default)]
struct ScriptedAdapter {
    failing: Mutex<HashSet<NodeId>>,
    stall: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    fn stalling(stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::default()
        }
    }

    async fn check(&self, id: NodeId) -> PersistResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        if self.failing.lock().unwrap().contains(&id) {
            return Err(PersistenceError::Transport(format!("refused {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for ScriptedAdapter {
    async fn create_folder(&self, folder: &Folder, _parent: Option<NodeId>) -> PersistResult<Folder> {
        self.check(folder.id).await?;
        Ok(folder.clone())
    }

    async fn create_item(&self, _folder_id: NodeId, item: &Item) -> PersistResult<Item> {
        self.check(item.id).await?;
        Ok(item.clone())
    }

    async fn update_node(&self, id: NodeId, _patch: &NodePatch) -> PersistResult<Node> {
        self.check(id).await?;
        Ok(Node::Folder(Folder::with_id(id, "stored")))
    }

    async fn delete_node(&self, id: NodeId) -> PersistResult<()> {
        self.check(id).await
    }
}

/// Workspace with confirmed folders `A { N }`, `B` and `C`.
async fn seeded(adapter: &ScriptedAdapter) -> (Workspace, [NodeId; 4]) {
    let mut ws = Workspace::new(EngineConfig::default());
    let a = ws.create_folder("A", None).unwrap();
    let n = ws.create_folder("N", Some(a.node_id)).unwrap();
    let b = ws.create_folder("B", None).unwrap();
    let c = ws.create_folder("C", None).unwrap();
    let ids = [a.node_id, n.node_id, b.node_id, c.node_id];
    for pending in [a, n, b, c] {
        assert!(ws.sync(adapter, &pending).await.is_none());
    }
    (ws, ids)
}

#[tokio::test]
async fn confirmed_mutations_leave_no_records() {
    let adapter = ScriptedAdapter::default();
    let (mut ws, [a, ..]) = seeded(&adapter).await;

    let pending = ws.rename(a, "  Alpha   team ").unwrap();
    assert_eq!(ws.in_flight_len(), 1);
    assert!(ws.sync(&adapter, &pending).await.is_none());

    assert_eq!(ws.in_flight_len(), 0);
    assert_eq!(ws.forest().get(a).unwrap().name(), "Alpha team");
    assert!(ws.take_notices().is_empty());
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn failed_move_rolls_back_only_its_own_node() {
    let adapter = ScriptedAdapter::default();
    let (mut ws, [a, n, b, c]) = seeded(&adapter).await;

    let moved = ws.move_node(n, Some(b), None).unwrap();
    let renamed = ws.rename(c, "Renamed").unwrap();
    adapter.failing.lock().unwrap().insert(n);

    let timeout = ws.persist_timeout();
    let (move_outcome, rename_outcome) = tokio::join!(
        persist(&adapter, &moved, timeout),
        persist(&adapter, &renamed, timeout)
    );
    assert!(ws.settle(rename_outcome).is_none());
    let notice = ws.settle(move_outcome).expect("move failure reported");

    assert_eq!(notice.reverted, vec![n]);
    assert!(notice.superseded.is_empty());
    assert_eq!(ws.forest().parent_of(n).unwrap(), Some(a));
    assert_eq!(ws.forest().get(c).unwrap().name(), "Renamed");
    assert_eq!(ws.take_notices().len(), 1);
}

#[tokio::test]
async fn late_failure_never_reverts_a_newer_edit() {
    let adapter = ScriptedAdapter::default();
    let (mut ws, [a, ..]) = seeded(&adapter).await;

    let first = ws.rename(a, "One").unwrap();
    let second = ws.rename(a, "Two").unwrap();
    assert!(ws.sync(&adapter, &second).await.is_none());

    adapter.failing.lock().unwrap().insert(a);
    let notice = ws.sync(&adapter, &first).await.expect("failure reported");

    assert!(notice.reverted.is_empty());
    assert_eq!(notice.superseded, vec![a]);
    assert_eq!(ws.forest().get(a).unwrap().name(), "Two");
    assert_eq!(ws.in_flight_len(), 0);
}

#[tokio::test]
async fn failed_delete_reinserts_subtree_at_origin() {
    let adapter = ScriptedAdapter::default();
    let (mut ws, [a, n, ..]) = seeded(&adapter).await;
    let before = ws.forest().clone();

    let pending = ws.delete(a).unwrap();
    assert!(!ws.forest().contains(n));

    adapter.failing.lock().unwrap().insert(a);
    let notice = ws.sync(&adapter, &pending).await.expect("failure reported");

    assert_eq!(notice.reverted.len(), 2);
    assert_eq!(ws.forest(), &before);
}

#[tokio::test]
async fn failed_item_create_is_removed_again() {
    let adapter = ScriptedAdapter::default();
    let (mut ws, [a, ..]) = seeded(&adapter).await;

    let pending = ws
        .create_item(a, ItemKind::Document, "Spec", "draft")
        .unwrap();
    adapter.failing.lock().unwrap().insert(pending.node_id);
    let notice = ws.sync(&adapter, &pending).await.expect("failure reported");

    assert_eq!(notice.reverted, vec![pending.node_id]);
    assert!(!ws.forest().contains(pending.node_id));
    assert_eq!(ws.forest().children(Some(a)).unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_store_counts_as_timeout_failure() {
    let adapter = ScriptedAdapter::stalling(Duration::from_secs(60));
    let config = EngineConfig::from_json_str(r#"{"persist_timeout_ms": 500}"#).unwrap();
    let mut ws = Workspace::new(config);

    let pending = ws.create_folder("Slow", None).unwrap();
    let outcome = persist(&adapter, &pending, ws.persist_timeout()).await;
    assert_eq!(
        outcome.result,
        Err(PersistenceError::Timeout(Duration::from_millis(500)))
    );

    let notice = ws.settle(outcome).expect("timeout reported");
    assert!(notice.message.contains("500 ms"));
    assert!(ws.forest().is_empty());
}

#[tokio::test]
async fn settling_twice_is_ignored() {
    let adapter = ScriptedAdapter::default();
    let mut ws = Workspace::new(EngineConfig::default());
    let pending = ws.create_folder("Once", None).unwrap();

    let outcome = persist(&adapter, &pending, ws.persist_timeout()).await;
    assert!(ws.settle(outcome.clone()).is_none());
    assert!(ws.settle(outcome).is_none());
    assert_eq!(ws.forest().len(), 1);
}
