//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted `Note` record and its id-less `NoteDraft` input.
//! - Own the fixed first-run seed set.
//!
//! # Invariants
//! - `id` is assigned by storage on insert and never changes afterwards.
//! - `priority` carries no range constraint at this layer.
//! - Title and description are stored verbatim; no validation happens here.

use serde::{Deserialize, Serialize};

/// Storage-assigned note identifier (`notes.id`).
pub type NoteId = i64;

/// Number of notes inserted on first store creation.
pub const SEED_NOTE_COUNT: usize = 3;

/// A persisted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Monotonic storage id. Never reused within one store lifetime.
    pub id: NoteId,
    pub title: String,
    pub description: String,
    pub priority: i32,
}

impl Note {
    /// Builds the full replacement record used by update flows.
    pub fn new(
        id: NoteId,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            priority,
        }
    }

    /// Returns the draft view of this note, dropping its id.
    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
        }
    }
}

/// A note that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub description: String,
    pub priority: i32,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>, priority: i32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
        }
    }

    /// Attaches a storage-assigned id.
    pub fn with_id(self, id: NoteId) -> Note {
        Note {
            id,
            title: self.title,
            description: self.description,
            priority: self.priority,
        }
    }
}

/// Returns the notes inserted when a store is created for the first time.
pub fn seed_notes() -> [NoteDraft; SEED_NOTE_COUNT] {
    [
        NoteDraft::new("Title 1", "Description 1", 1),
        NoteDraft::new("Title 2", "Description 2", 2),
        NoteDraft::new("Title 3", "Description 3", 3),
    ]
}

#[cfg(test)]
mod tests {
    use super::{seed_notes, Note, NoteDraft};

    #[test]
    fn seed_set_is_fixed_and_ordered_by_priority() {
        let seeds = seed_notes();
        let titles: Vec<&str> = seeds.iter().map(|seed| seed.title.as_str()).collect();
        assert_eq!(titles, vec!["Title 1", "Title 2", "Title 3"]);
        assert_eq!(seeds[1].description, "Description 2");
        assert_eq!(seeds[2].priority, 3);
    }

    #[test]
    fn draft_with_id_keeps_fields() {
        let note = NoteDraft::new("Milk", "Buy milk", 2).with_id(7);
        assert_eq!(note, Note::new(7, "Milk", "Buy milk", 2));
        assert_eq!(note.to_draft(), NoteDraft::new("Milk", "Buy milk", 2));
    }

    #[test]
    fn note_serializes_with_plain_field_names() {
        let note = Note::new(1, "Title 1", "Description 1", -4);
        let value = serde_json::to_value(&note).expect("note should serialize");
        assert_eq!(value["id"], 1);
        assert_eq!(value["title"], "Title 1");
        assert_eq!(value["priority"], -4);
    }
}
