//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the note store contract consumed by admission and placement.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository reads reject corrupt rows instead of masking them, except
//!   for unknown wall labels which resolve to the fallback wall.

pub mod note_repo;
