//! Core domain logic for the story wall: notes pinned to the walls of a
//! shared room.
//! This crate is the single source of truth for placement and admission
//! invariants.

pub mod admission;
pub mod config;
pub mod db;
pub mod layout;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use admission::{
    Admission, AdmissionController, Clock, DenyReason, ManualClock, QuotaConsistency,
    QuotaPolicy, RateDecision, RateLimitConfig, RateLimiter, SystemClock, DEFAULT_NOTE_CAP,
};
pub use config::{ConfigError, StoryWallConfig};
pub use layout::{
    compute_layout, compute_slots, GridSlot, Layout, NoTilt, RandomTilt, RoomDimensions,
    SlotAssignment, TiltSource, Vec3,
};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::note::{
    NewNote, Note, NoteDraft, NotePosition, NoteValidationError, PublicNote, Wall,
};
pub use repo::note_repo::{CapInsert, NoteStore, RepoError, RepoResult, SqliteNoteRepository};
pub use service::wall_service::{PostNoteError, WallService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
