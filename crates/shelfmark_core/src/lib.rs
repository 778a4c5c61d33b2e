//! Core folder/item tree engine for Shelfmark.
//! This crate is the single source of truth for hierarchy invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;
pub mod session;
pub mod tree;

pub use config::{ConfigError, EngineConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::node::{Folder, Item, ItemKind, Node, NodeId, NodeKind};
pub use model::view::{forest_view, NodeView, Projection};
pub use reconcile::adapter::{persist, PersistOutcome, PersistResult, PersistenceAdapter, PersistenceError};
pub use reconcile::command::{Mutation, MutationId, MutationKind, NodePatch, PendingPersist, PersistRequest};
pub use reconcile::reconciler::{PersistenceNotice, Reconciler};
pub use repo::node_store::{SqliteNodeStore, StoreError, StoreResult};
pub use service::workspace::{Workspace, WorkspaceError, WorkspaceResult};
pub use session::drag::{DragEnd, DragError, DragSession, DragState, HoverOutcome};
pub use tree::error::{TreeError, TreeResult};
pub use tree::forest::{Forest, Located, Placement};
pub use tree::mutation::{FolderStyle, ItemEdit, MoveOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
