//! Domain model for persisted notes.
//!
//! # Responsibility
//! - Define the record shape shared by storage, notification and facade layers.
//! - Keep identity rules next to the record they govern.
//!
//! # Invariants
//! - Every persisted note is identified by a storage-assigned `NoteId`.
//! - Deletion is a hard delete; ids are never handed out again.

pub mod note;
