//! Domain model for notes pinned to the room walls.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep transport drafts separate from validated, insertable notes.
//!
//! # Invariants
//! - Every note is identified by a stable, unique `id`.
//! - Notes are append-only: never edited or deleted by core.

pub mod note;
