//! Schema registry, migration executor and destructive fallback.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//! - Drop and recreate the schema when it cannot be migrated.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A recreated schema is reported as `SchemaState::Recreated` so callers
//!   can seed it again.

use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;

pub const NOTES_TABLE: &str = "notes";
const NOTES_COLUMNS: [&str; 4] = ["id", "title", "description", "priority"];

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_notes.sql"),
}];

/// How the schema looked before this open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// The store did not exist and was created.
    Created,
    /// The store existed; pending migrations (if any) were applied.
    Opened,
    /// The store existed with an unusable schema and was dropped/recreated.
    Recreated,
}

impl SchemaState {
    /// Whether the store is empty by construction and needs seed data.
    pub fn needs_seed(self) -> bool {
        matches!(self, Self::Created | Self::Recreated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Opened => "opened",
            Self::Recreated => "recreated",
        }
    }
}

/// Returns the latest schema version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the connection's schema to `latest_version()`.
///
/// With `destructive_fallback`, a newer-than-supported version or a notes
/// table missing required columns is resolved by dropping every user table
/// and recreating the schema.
pub fn prepare_schema(conn: &mut Connection, destructive_fallback: bool) -> DbResult<SchemaState> {
    let current = current_user_version(conn)?;
    let latest = latest_version();

    if current > latest {
        if !destructive_fallback {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: current,
                latest_supported: latest,
            });
        }
        warn!(
            "event=schema_recreate module=db status=start reason=newer_version db_version={} latest={}",
            current, latest
        );
        recreate_schema(conn)?;
        return Ok(SchemaState::Recreated);
    }

    let fresh = current == 0 && !table_exists(conn, NOTES_TABLE)?;
    apply_migrations(conn, current)?;

    match verify_notes_table(conn) {
        Ok(()) => {
            let state = if fresh {
                SchemaState::Created
            } else {
                SchemaState::Opened
            };
            info!(
                "event=schema_ready module=db status=ok state={} version={}",
                state.as_str(),
                latest
            );
            Ok(state)
        }
        Err(DbError::IncompatibleSchema { table, column }) if destructive_fallback => {
            warn!(
                "event=schema_recreate module=db status=start reason=incompatible table={} column={}",
                table, column
            );
            recreate_schema(conn)?;
            Ok(SchemaState::Recreated)
        }
        Err(err) => Err(err),
    }
}

fn apply_migrations(conn: &mut Connection, current_version: u32) -> DbResult<()> {
    if current_version >= latest_version() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

fn recreate_schema(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction()?;
    let tables = {
        let mut stmt = tx.prepare(
            "SELECT name
             FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%';",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        names
    };

    for table in &tables {
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS \"{}\";",
            table.replace('"', "\"\"")
        ))?;
    }
    tx.execute_batch("PRAGMA user_version = 0;")?;
    for migration in MIGRATIONS {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=schema_recreate module=db status=ok dropped_tables={} version={}",
        tables.len(),
        latest_version()
    );
    Ok(())
}

fn verify_notes_table(conn: &Connection) -> DbResult<()> {
    for column in NOTES_COLUMNS {
        if !table_has_column(conn, NOTES_TABLE, column)? {
            return Err(DbError::IncompatibleSchema {
                table: NOTES_TABLE,
                column,
            });
        }
    }
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
