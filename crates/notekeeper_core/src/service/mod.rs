//! Use-case facades consumed by presentation layers.
//!
//! # Responsibility
//! - Translate caller-level arguments into store operations.
//! - Keep UI glue decoupled from storage and threading details.

pub mod note_service;
