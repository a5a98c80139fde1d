//! Transport contract for the story wall: framework-neutral handlers for
//! the `/notes` endpoints.

pub mod api;
pub mod response;

pub use api::{decode_notes, origin_token_from_forwarded, StoryWallApp, UNKNOWN_ORIGIN};
pub use response::{ApiError, ApiResponse};
