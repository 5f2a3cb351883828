//! Note persistence contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `notes` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Ids come from `AUTOINCREMENT` and are never reused, even after
//!   `delete_all_notes`.
//! - `list_notes` is ordered by `id ASC`.
//! - Update and delete report `NotFound` when no row matches.
//! - No field validation: any title/description/priority is stored as given.

use crate::db::DbError;
use crate::model::note::{Note, NoteDraft, NoteId};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTE_SELECT_SQL: &str = "SELECT id, title, description, priority FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(NoteId),
    InvalidData(String),
}

impl RepoError {
    /// Short stable code for log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(_) => "db_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Data access interface for notes.
pub trait NoteDao {
    /// Persists a new note and returns its assigned id.
    fn insert_note(&mut self, draft: &NoteDraft) -> RepoResult<NoteId>;
    /// Replaces title, description and priority of the note with `note.id`.
    fn update_note(&mut self, note: &Note) -> RepoResult<()>;
    fn delete_note(&mut self, id: NoteId) -> RepoResult<()>;
    /// Removes every note and returns how many rows were removed.
    fn delete_all_notes(&mut self) -> RepoResult<usize>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Returns all notes ordered by id.
    fn list_notes(&self) -> RepoResult<Vec<Note>>;
    /// Inserts all drafts in a single transaction.
    fn seed_notes(&mut self, drafts: &[NoteDraft]) -> RepoResult<Vec<NoteId>>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteDao<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteDao<'conn> {
    /// Wraps a connection returned by `db::open_with`.
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl NoteDao for SqliteNoteDao<'_> {
    fn insert_note(&mut self, draft: &NoteDraft) -> RepoResult<NoteId> {
        insert_row(self.conn, draft)
    }

    fn update_note(&mut self, note: &Note) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?2,
                description = ?3,
                priority = ?4
             WHERE id = ?1;",
            params![
                note.id,
                note.title.as_str(),
                note.description.as_str(),
                note.priority
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(note.id));
        }

        Ok(())
    }

    fn delete_note(&mut self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_all_notes(&mut self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM notes;", [])?;
        Ok(removed)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }

    fn seed_notes(&mut self, drafts: &[NoteDraft]) -> RepoResult<Vec<NoteId>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            ids.push(insert_row(&tx, draft)?);
        }
        tx.commit()?;
        Ok(ids)
    }
}

fn insert_row(conn: &Connection, draft: &NoteDraft) -> RepoResult<NoteId> {
    conn.execute(
        "INSERT INTO notes (title, description, priority) VALUES (?1, ?2, ?3);",
        params![
            draft.title.as_str(),
            draft.description.as_str(),
            draft.priority
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: NoteId = row.get("id")?;
    if id < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative id `{id}` in notes.id"
        )));
    }

    Ok(Note {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        priority: row.get("priority")?,
    })
}
