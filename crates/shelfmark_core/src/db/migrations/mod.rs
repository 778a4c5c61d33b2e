//! Schema migrations for the node database.
//!
//! # Responsibility
//! - List the schema scripts in the order they must run.
//! - Bring a connection up to [`latest_version`] in one transaction.
//!
//! # Invariants
//! - Versions start at 1 and grow by one per script.
//! - A failing script leaves `user_version` and every table as they were.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "nodes",
        sql: include_str!("0001_nodes.sql"),
    },
    Migration {
        version: 2,
        name: "node_tags",
        sql: include_str!("0002_node_tags.sql"),
    },
];

/// Schema version written by the newest script in this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.iter().map(|migration| migration.version).max().unwrap_or(0)
}

/// Reads the schema version stamped on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Runs every script newer than the stamped version and returns how many ran.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is ahead of this build.
/// - `Migration` naming the first script that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for migration in &pending {
        tx.execute_batch(migration.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", migration.version))
            .map_err(|source| DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        from,
        latest,
        pending.len()
    );
    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, schema_version, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (position, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, position + 1, "{}", migration.name);
        }
        assert_eq!(latest_version() as usize, MIGRATIONS.len());
    }

    #[test]
    fn second_run_applies_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), MIGRATIONS.len());
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .unwrap();
        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedSchemaVersion { .. }));
        assert_eq!(err.code(), "db_schema_too_new");
    }

    #[test]
    fn failing_script_rolls_back_the_batch() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE nodes (legacy INTEGER);").unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(matches!(err, DbError::Migration { version: 1, name: "nodes", .. }));
        assert_eq!(schema_version(&conn).unwrap(), 0);
        let tags_tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'node_tags';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tags_tables, 0);
    }
}
