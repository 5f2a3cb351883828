//! Note repository facade.
//!
//! # Responsibility
//! - Single entry point for presentation code: mutate notes, observe the
//!   full list.
//! - Forward every mutation to the store's background writer.
//!
//! # Invariants
//! - No business rules beyond argument shaping and forwarding.
//! - Mutations are fire-and-forget; their effect is observed through
//!   `all_notes` / `subscribe_all_notes`.

use crate::model::note::{Note, NoteDraft, NoteId};
use crate::store::{NoteStore, NotesWatch, StoreResult, Subscription};
use std::sync::Arc;

/// Facade over a shared `NoteStore`.
#[derive(Debug, Clone)]
pub struct NoteRepository {
    store: Arc<NoteStore>,
}

impl NoteRepository {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<NoteStore> {
        &self.store
    }

    /// Queues a new note; the id is assigned by storage.
    pub fn insert(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: i32,
    ) -> StoreResult<()> {
        self.store.insert(NoteDraft::new(title, description, priority))
    }

    /// Queues full replacement of note `id`.
    pub fn update(
        &self,
        id: NoteId,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: i32,
    ) -> StoreResult<()> {
        self.store.update(Note::new(id, title, description, priority))
    }

    pub fn delete(&self, id: NoteId) -> StoreResult<()> {
        self.store.delete(id)
    }

    pub fn delete_all(&self) -> StoreResult<()> {
        self.store.delete_all()
    }

    /// Live note list as an async stream.
    pub fn all_notes(&self) -> NotesWatch {
        self.store.all_notes()
    }

    /// Registers `callback` for the current list and every later change.
    pub fn subscribe_all_notes<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&[Note]) + Send + 'static,
    {
        self.store.subscribe(callback)
    }

    /// See `NoteStore::flush`.
    pub fn flush(&self) -> StoreResult<()> {
        self.store.flush()
    }

    /// See `NoteStore::flush_async`.
    pub async fn flush_async(&self) -> StoreResult<()> {
        self.store.flush_async().await
    }
}
