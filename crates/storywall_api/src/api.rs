//! Request handlers for the notes endpoints.
//!
//! # Responsibility
//! - Bind the core services to the `GET /notes`, `POST /notes` and
//!   `GET /notes/layout` contract.
//! - Own the process-wide admission state shared by all requests.
//!
//! # Invariants
//! - Handlers never panic; every failure becomes an [`ApiResponse`].
//! - Each request opens its own store connection, so the read-then-write
//!   quota check is not serialized across requests.
//! - Client-facing bodies never include origin tokens.

use crate::response::{ApiError, ApiResponse};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use storywall_core::db::open_db;
use storywall_core::{
    AdmissionController, Clock, ConfigError, NoteDraft, PublicNote, RandomTilt, RateLimiter,
    SqliteNoteRepository, StoryWallConfig, SystemClock, TiltSource, WallService,
};

/// Origin token used when the request carries no forwarding metadata.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Derives the origin token from an `X-Forwarded-For` header value.
///
/// The first (client-most) entry wins; absent or blank headers map to
/// [`UNKNOWN_ORIGIN`].
pub fn origin_token_from_forwarded(header: Option<&str>) -> String {
    header
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_ORIGIN)
        .to_string()
}

/// Shared application state; one per process.
pub struct StoryWallApp {
    config: StoryWallConfig,
    admission: AdmissionController,
}

impl StoryWallApp {
    pub fn new(config: StoryWallConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: StoryWallConfig, clock: Arc<dyn Clock>) -> Self {
        let limiter = RateLimiter::in_memory(config.rate_limit, clock);
        let admission = AdmissionController::new(limiter, config.quota);
        Self { config, admission }
    }

    /// Builds the app from `STORYWALL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        StoryWallConfig::from_env().map(Self::new)
    }

    pub fn config(&self) -> &StoryWallConfig {
        &self.config
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Routes one request. Unknown paths yield 404, known paths with the
    /// wrong method 405.
    pub fn handle(
        &self,
        method: &str,
        path: &str,
        body: &str,
        forwarded_for: Option<&str>,
    ) -> ApiResponse {
        let started_at = Instant::now();
        let path_only = path.split('?').next().unwrap_or(path).trim_end_matches('/');
        let method = method.trim().to_ascii_uppercase();

        let response = match (method.as_str(), path_only) {
            ("GET", "/notes") => self.get_notes(),
            ("POST", "/notes") => self.post_notes(body, forwarded_for),
            ("GET", "/notes/layout") => self.get_layout(),
            (_, "/notes") | (_, "/notes/layout") => ApiError::MethodNotAllowed.into_response(),
            _ => ApiError::NotFound.into_response(),
        };

        info!(
            "event=http_request module=api method={} path={} status={} duration_ms={}",
            method,
            path_only,
            response.status,
            started_at.elapsed().as_millis()
        );
        response
    }

    /// `GET /notes`: every note, insertion order, without origin tokens.
    pub fn get_notes(&self) -> ApiResponse {
        let result = self.with_service(|service| {
            let notes = service
                .list_notes()
                .map_err(|err| ApiError::Internal(err.to_string()))?;
            Ok(notes.iter().map(|note| note.to_public()).collect::<Vec<_>>())
        });
        respond(result)
    }

    /// `POST /notes`: validates, admits and persists one note.
    pub fn post_notes(&self, body: &str, forwarded_for: Option<&str>) -> ApiResponse {
        let origin = origin_token_from_forwarded(forwarded_for);
        let draft: NoteDraft = match serde_json::from_str(body) {
            Ok(draft) => draft,
            Err(err) => {
                return ApiError::BadRequest(format!("invalid note payload: {err}"))
                    .into_response();
            }
        };

        let result = self.with_service(|service| {
            let created = service.post_note(&origin, &draft)?;
            Ok(created.to_public())
        });
        respond(result)
    }

    /// `GET /notes/layout`: server-side placement with random tilt.
    pub fn get_layout(&self) -> ApiResponse {
        self.get_layout_with(&mut RandomTilt::from_entropy())
    }

    /// Server-side placement with a caller-chosen tilt source.
    pub fn get_layout_with(&self, tilt: &mut impl TiltSource) -> ApiResponse {
        let result = self.with_service(|service| {
            let layout = service
                .layout(tilt)
                .map_err(|err| ApiError::Internal(err.to_string()))?;
            Ok(layout.into_assignments())
        });
        respond(result)
    }

    fn with_service<T>(
        &self,
        f: impl FnOnce(&mut WallService<'_, SqliteNoteRepository<'_>>) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut conn = open_db(&self.config.database_path)
            .map_err(|err| ApiError::Internal(format!("note store open failed: {err}")))?;
        let repo = SqliteNoteRepository::try_new(&mut conn)
            .map_err(|err| ApiError::Internal(format!("note store init failed: {err}")))?;
        let mut service = WallService::new(
            repo,
            &self.admission,
            self.config.grid_columns,
            self.config.room,
        );
        f(&mut service)
    }
}

fn respond<T: serde::Serialize>(result: Result<T, ApiError>) -> ApiResponse {
    match result {
        Ok(body) => ApiResponse::ok(body),
        Err(err) => {
            if let ApiError::Internal(details) = &err {
                warn!(
                    "event=http_error module=api status=error error_code=internal error={}",
                    details
                );
            }
            err.into_response()
        }
    }
}

/// Public note list decoded from a `GET /notes` body.
pub fn decode_notes(response: &ApiResponse) -> Result<Vec<PublicNote>, serde_json::Error> {
    serde_json::from_value(response.body.clone())
}

#[cfg(test)]
mod tests {
    use super::{origin_token_from_forwarded, UNKNOWN_ORIGIN};

    #[test]
    fn forwarded_header_uses_first_entry() {
        assert_eq!(
            origin_token_from_forwarded(Some("203.0.113.5, 10.0.0.1")),
            "203.0.113.5"
        );
        assert_eq!(origin_token_from_forwarded(Some(" 198.51.100.2 ")), "198.51.100.2");
    }

    #[test]
    fn missing_or_blank_header_is_unknown() {
        assert_eq!(origin_token_from_forwarded(None), UNKNOWN_ORIGIN);
        assert_eq!(origin_token_from_forwarded(Some("  ")), UNKNOWN_ORIGIN);
        assert_eq!(origin_token_from_forwarded(Some(",10.0.0.1")), UNKNOWN_ORIGIN);
    }
}
