//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for notes.
//! - Isolate SQLite query details from the store and facade layers.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod note_repo;
