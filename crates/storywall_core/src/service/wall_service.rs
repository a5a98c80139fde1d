//! Wall use-case service.
//!
//! # Responsibility
//! - Run the note-creation path: validate, admit, persist.
//! - Serve the note list and its placement.
//!
//! # Invariants
//! - Validation runs before admission; admission's rate check runs before
//!   any store lookup; the quota check runs before the insert.
//! - With `QuotaConsistency::Atomic` the quota check and insert are a single
//!   store transaction.

use crate::admission::{
    origin_fingerprint, Admission, AdmissionController, DenyReason, QuotaConsistency,
};
use crate::layout::{compute_layout, Layout, RoomDimensions, TiltSource};
use crate::model::note::{NewNote, Note, NoteDraft, NoteValidationError};
use crate::repo::note_repo::{CapInsert, NoteStore, RepoError, RepoResult};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;

/// Failure of the note-creation path.
#[derive(Debug)]
pub enum PostNoteError {
    /// Malformed draft; resubmit with corrected input.
    Validation(NoteValidationError),
    /// Too many requests from this origin; retry after the window.
    RateLimited { retry_after_ms: u64 },
    /// Origin already holds its note quota; terminal.
    QuotaExceeded { cap: u32 },
    /// Note store failed; not retried internally.
    StoreUnavailable(RepoError),
}

impl PostNoteError {
    /// Only rate limiting is recoverable by retrying the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl Display for PostNoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::RateLimited { retry_after_ms } => {
                write!(f, "too many requests; retry in {retry_after_ms} ms")
            }
            Self::QuotaExceeded { cap } => {
                write!(f, "posting limit reached: at most {cap} note(s) per visitor")
            }
            Self::StoreUnavailable(err) => write!(f, "note store unavailable: {err}"),
        }
    }
}

impl Error for PostNoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StoreUnavailable(err) => Some(err),
            Self::RateLimited { .. } | Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<NoteValidationError> for PostNoteError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for PostNoteError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateId(id) => Self::Validation(NoteValidationError::DuplicateId(id)),
            other => Self::StoreUnavailable(other),
        }
    }
}

impl From<DenyReason> for PostNoteError {
    fn from(value: DenyReason) -> Self {
        match value {
            DenyReason::RateLimited { retry_after_ms } => Self::RateLimited { retry_after_ms },
            DenyReason::QuotaExceeded { cap, .. } => Self::QuotaExceeded { cap },
        }
    }
}

/// Per-request service over one store handle and the shared admission state.
pub struct WallService<'a, S: NoteStore> {
    store: S,
    admission: &'a AdmissionController,
    grid_columns: NonZeroU32,
    room: RoomDimensions,
}

impl<'a, S: NoteStore> WallService<'a, S> {
    pub fn new(
        store: S,
        admission: &'a AdmissionController,
        grid_columns: NonZeroU32,
        room: RoomDimensions,
    ) -> Self {
        Self {
            store,
            admission,
            grid_columns,
            room,
        }
    }

    /// All notes in insertion order.
    pub fn list_notes(&self) -> RepoResult<Vec<Note>> {
        self.store.list_all()
    }

    /// Placement of every stored note.
    pub fn layout(&self, tilt: &mut impl TiltSource) -> RepoResult<Layout> {
        let notes = self.store.list_all()?;
        Ok(compute_layout(&notes, self.grid_columns, &self.room, tilt))
    }

    /// Creates one note on behalf of `origin_token`.
    pub fn post_note(
        &mut self,
        origin_token: &str,
        draft: &NoteDraft,
    ) -> Result<Note, PostNoteError> {
        let origin = origin_fingerprint(origin_token);
        let note = draft.validate(origin_token).map_err(|err| {
            info!(
                "event=note_create module=service status=rejected origin={} reason=validation error={}",
                origin, err
            );
            PostNoteError::Validation(err)
        })?;

        let result = match self.admission.quota().consistency {
            QuotaConsistency::ReadThenWrite => self.admit_then_create(&note),
            QuotaConsistency::Atomic => self.create_under_cap(&note),
        };

        match &result {
            Ok(created) => info!(
                "event=note_create module=service status=ok origin={} wall={} content_chars={}",
                origin,
                created.wall,
                created.content.chars().count()
            ),
            Err(PostNoteError::StoreUnavailable(err)) => error!(
                "event=note_create module=service status=error origin={} error_code=store_unavailable error={}",
                origin, err
            ),
            Err(err) => warn!(
                "event=note_create module=service status=denied origin={} error={}",
                origin, err
            ),
        }
        result
    }

    fn admit_then_create(&mut self, note: &NewNote) -> Result<Note, PostNoteError> {
        let store = &self.store;
        let admission = self
            .admission
            .check_admission(&note.origin_token, || {
                store.count_by_origin(&note.origin_token)
            })?;
        if let Admission::Deny(reason) = admission {
            return Err(reason.into());
        }

        Ok(self.store.create(note)?)
    }

    fn create_under_cap(&mut self, note: &NewNote) -> Result<Note, PostNoteError> {
        if let Admission::Deny(reason) = self.admission.check_rate(&note.origin_token) {
            return Err(reason.into());
        }

        let cap = self.admission.quota().cap;
        match self.store.create_if_under_cap(note, cap)? {
            CapInsert::Inserted(created) => Ok(created),
            CapInsert::CapReached { .. } => Err(PostNoteError::QuotaExceeded { cap }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PostNoteError;
    use crate::admission::DenyReason;
    use crate::model::note::NoteValidationError;
    use crate::repo::note_repo::RepoError;

    #[test]
    fn only_rate_limiting_is_retryable() {
        assert!(PostNoteError::RateLimited { retry_after_ms: 5 }.is_retryable());
        assert!(!PostNoteError::QuotaExceeded { cap: 1 }.is_retryable());
        assert!(!PostNoteError::Validation(NoteValidationError::EmptyContent).is_retryable());
        assert!(
            !PostNoteError::StoreUnavailable(RepoError::InvalidData("x".into())).is_retryable()
        );
    }

    #[test]
    fn duplicate_ids_surface_as_validation_errors() {
        let err = PostNoteError::from(RepoError::DuplicateId("n1".to_string()));
        assert!(matches!(
            err,
            PostNoteError::Validation(NoteValidationError::DuplicateId(ref id)) if id == "n1"
        ));
    }

    #[test]
    fn deny_reasons_map_onto_error_taxonomy() {
        assert!(matches!(
            PostNoteError::from(DenyReason::QuotaExceeded {
                cap: 2,
                existing: 2
            }),
            PostNoteError::QuotaExceeded { cap: 2 }
        ));
        assert!(matches!(
            PostNoteError::from(DenyReason::RateLimited { retry_after_ms: 9 }),
            PostNoteError::RateLimited { retry_after_ms: 9 }
        ));
    }
}
