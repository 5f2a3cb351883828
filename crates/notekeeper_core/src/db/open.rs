//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by the store.
//! - Prepare the schema before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have the schema at `latest_version()`.
//! - Every open reports whether the store was created, opened or recreated.

use super::migrations::{prepare_schema, SchemaState};
use super::DbResult;
use crate::config::{StoreConfig, StoreLocation};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// A ready connection plus the schema state observed while opening it.
#[derive(Debug)]
pub struct OpenedDb {
    pub conn: Connection,
    pub state: SchemaState,
}

/// Opens (creating if needed) a database file with destructive fallback.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<OpenedDb> {
    open_with(&StoreConfig::file(path.as_ref()))
}

/// Opens a private in-memory database. Always reports `SchemaState::Created`.
pub fn open_db_in_memory() -> DbResult<OpenedDb> {
    open_with(&StoreConfig::in_memory())
}

/// Opens the database described by `config`.
///
/// # Side effects
/// - Creates the database file when it does not exist.
/// - May drop and recreate the schema (see `prepare_schema`).
/// - Emits `db_open` logging events with duration and status.
pub fn open_with(config: &StoreConfig) -> DbResult<OpenedDb> {
    let started_at = Instant::now();
    let mode = match config.location {
        StoreLocation::File(_) => "file",
        StoreLocation::Memory => "memory",
    };
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.location {
        StoreLocation::File(path) => Connection::open(path),
        StoreLocation::Memory => Connection::open_in_memory(),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, config.destructive_fallback) {
        Ok(state) => {
            info!(
                "event=db_open module=db status=ok mode={} state={} duration_ms={}",
                mode,
                state.as_str(),
                started_at.elapsed().as_millis()
            );
            Ok(OpenedDb { conn, state })
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, destructive_fallback: bool) -> DbResult<SchemaState> {
    conn.busy_timeout(Duration::from_secs(5))?;
    prepare_schema(conn, destructive_fallback)
}
