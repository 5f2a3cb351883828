//! Core note storage for notekeeper.
//! Durable notes, a single background writer, and live note-list updates.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{LogConfig, StoreConfig, StoreLocation};
pub use db::{DbError, SchemaState};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{seed_notes, Note, NoteDraft, NoteId};
pub use repo::note_repo::{NoteDao, RepoError, RepoResult, SqliteNoteDao};
pub use service::note_service::NoteRepository;
pub use store::{
    NoteList, NoteStore, NotesWatch, StoreCell, StoreError, StoreResult, Subscription,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
