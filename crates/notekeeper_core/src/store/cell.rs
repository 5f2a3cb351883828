//! Lazily opened, shared note store.

use super::{NoteStore, StoreResult};
use crate::config::StoreConfig;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Opens its store at most once, on first access.
///
/// Concurrent first calls block until a single open (and its seed decision)
/// has finished. A failed open leaves the cell empty so a later call can
/// retry.
pub struct StoreCell {
    config: StoreConfig,
    store: OnceCell<Arc<NoteStore>>,
}

impl StoreCell {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            store: OnceCell::new(),
        }
    }

    /// Returns the shared store, opening it on first use.
    pub fn get_or_open(&self) -> StoreResult<Arc<NoteStore>> {
        self.store
            .get_or_try_init(|| NoteStore::open(&self.config).map(Arc::new))
            .map(Arc::clone)
    }

    /// Returns the store if it has been opened already.
    pub fn get(&self) -> Option<Arc<NoteStore>> {
        self.store.get().cloned()
    }
}
