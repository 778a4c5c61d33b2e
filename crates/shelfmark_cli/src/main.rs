//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `shelfmark_core` linkage.
//! - Run one scripted drag/drop against a real SQLite store and print the
//!   resulting projection.
//!
//! Usage: `shelfmark [db_path] [config_path]`. Without `db_path` the store
//! lives in memory.

use shelfmark_core::{
    init_logging_from_config, open_db, open_db_in_memory, EngineConfig, ItemKind, PendingPersist,
    SqliteNodeStore, Workspace,
};
use std::error::Error;

fn main() {
    println!("shelfmark_core ping={}", shelfmark_core::ping());
    println!("shelfmark_core version={}", shelfmark_core::core_version());

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Box::<dyn Error>::from)
        .and_then(|runtime| runtime.block_on(run()));
    if let Err(err) = result {
        eprintln!("shelfmark error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    let config = match args.next() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_logging_from_config(&config)?;

    let conn = match db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let store = SqliteNodeStore::try_new(conn)?;
    let mut workspace = Workspace::with_forest(store.load_forest()?, config);

    let mut pending: Vec<PendingPersist> = Vec::new();
    let inbox = workspace.create_folder("Inbox", None)?;
    let archive = workspace.create_folder("Archive", None)?;
    let note = workspace.create_item(inbox.node_id, ItemKind::Note, "Scratch", "hello")?;
    let (inbox_id, archive_id, note_id) = (inbox.node_id, archive.node_id, note.node_id);
    pending.extend([inbox, archive, note]);

    workspace.drag_start(note_id)?;
    workspace.drag_over(archive_id)?;
    if let Some(moved) = workspace.drop(archive_id)? {
        pending.push(moved);
    }

    for ticket in &pending {
        if let Some(notice) = workspace.sync(&store, ticket).await {
            eprintln!(
                "persist failed mutation_id={} kind={} reverted={}",
                notice.mutation_id,
                notice.kind.as_str(),
                notice.reverted.len()
            );
        }
    }

    println!("inbox={inbox_id} archive={archive_id} note={note_id}");
    println!(
        "stored_archive_children={}",
        store.list_children(Some(archive_id))?.len()
    );
    println!("{}", serde_json::to_string_pretty(&workspace.projection())?);
    Ok(())
}
