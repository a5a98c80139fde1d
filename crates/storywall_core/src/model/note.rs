//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note record pinned to one wall of the room.
//! - Validate transport drafts into insertable notes.
//!
//! # Invariants
//! - `id` is unique across the store and never reused.
//! - `origin_token` is never part of the client-facing projection.
//! - `created_at` is assigned by the store and never mutated.
//! - Unknown or missing wall labels resolve to `Wall::Front`.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Maximum accepted note body length, in characters.
pub const NOTE_CONTENT_MAX_CHARS: usize = 500;
/// Maximum accepted client-supplied id length, in characters.
pub const NOTE_ID_MAX_CHARS: usize = 64;

/// Named palette tokens accepted as `color`.
pub const PALETTE_TOKENS: &[&str] = &["yellow", "blue", "green", "pink", "purple"];

/// Hex colors a fresh note is painted with when the author picks none.
pub const STICKY_NOTE_COLORS: &[&str] = &[
    "#FFB6C1", "#FFC0CB", "#FFD700", "#98FB98", "#87CEEB", "#DDA0DD",
];

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid hex color regex")
});

/// Flat surface of the room a note is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wall {
    Front,
    Back,
    Left,
    Right,
    Floor,
}

impl Wall {
    pub const ALL: [Wall; 5] = [Wall::Front, Wall::Back, Wall::Left, Wall::Right, Wall::Floor];

    /// Wall used whenever a label is missing or not recognized.
    pub const FALLBACK: Wall = Wall::Front;

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
            Self::Floor => "floor",
        }
    }

    /// Strict, case-insensitive label parse.
    pub fn parse(label: &str) -> Option<Wall> {
        match label.trim().to_ascii_lowercase().as_str() {
            "front" => Some(Self::Front),
            "back" => Some(Self::Back),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "floor" => Some(Self::Floor),
            _ => None,
        }
    }

    /// Resolves a possibly missing label, falling back to [`Wall::FALLBACK`].
    pub fn from_label(label: Option<&str>) -> Wall {
        label.and_then(Wall::parse).unwrap_or(Self::FALLBACK)
    }
}

impl Display for Wall {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point in room space where the author clicked. Informational only; slot
/// placement never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Persisted note record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    pub wall: Wall,
    pub color: String,
    /// Derived from the requester network address; server-side only.
    pub origin_token: String,
    pub position: Option<NotePosition>,
    /// Unix epoch milliseconds, assigned by the store.
    pub created_at: i64,
}

impl Note {
    /// Client-facing projection without the origin token.
    pub fn to_public(&self) -> PublicNote {
        PublicNote {
            id: self.id.clone(),
            content: self.content.clone(),
            wall: self.wall,
            color: self.color.clone(),
            position: self.position,
            created_at: self.created_at,
        }
    }
}

/// Note as shown to every visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicNote {
    pub id: String,
    pub content: String,
    pub wall: Wall,
    pub color: String,
    pub position: Option<NotePosition>,
    pub created_at: i64,
}

/// Note creation payload as received from transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub wall: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub position: Option<NotePosition>,
}

/// Validated note ready for insertion; the store assigns `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub id: String,
    pub content: String,
    pub wall: Wall,
    pub color: String,
    pub origin_token: String,
    pub position: Option<NotePosition>,
}

/// Rejection reasons for a malformed draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyContent,
    ContentTooLong { max_chars: usize, actual_chars: usize },
    InvalidColor(String),
    InvalidId(String),
    /// Another note already uses this id; detected at insert time.
    DuplicateId(String),
    MissingOriginToken,
    NonFinitePosition,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "note content must not be empty"),
            Self::ContentTooLong {
                max_chars,
                actual_chars,
            } => write!(
                f,
                "note content has {actual_chars} characters; at most {max_chars} allowed"
            ),
            Self::InvalidColor(value) => write!(f, "invalid note color `{value}`"),
            Self::InvalidId(value) => write!(f, "invalid note id `{value}`"),
            Self::DuplicateId(value) => write!(f, "note id `{value}` is already taken"),
            Self::MissingOriginToken => write!(f, "origin token must not be empty"),
            Self::NonFinitePosition => write!(f, "note position must be finite"),
        }
    }
}

impl Error for NoteValidationError {}

impl NoteDraft {
    /// Validates this draft and binds it to the requesting origin.
    ///
    /// A missing id is replaced by a generated UUID v4, a blank color by a
    /// random [`STICKY_NOTE_COLORS`] entry. A missing or unknown wall label
    /// resolves to [`Wall::FALLBACK`].
    pub fn validate(&self, origin_token: &str) -> Result<NewNote, NoteValidationError> {
        let origin_token = origin_token.trim();
        if origin_token.is_empty() {
            return Err(NoteValidationError::MissingOriginToken);
        }

        let content = self.content.trim();
        if content.is_empty() {
            return Err(NoteValidationError::EmptyContent);
        }
        let actual_chars = content.chars().count();
        if actual_chars > NOTE_CONTENT_MAX_CHARS {
            return Err(NoteValidationError::ContentTooLong {
                max_chars: NOTE_CONTENT_MAX_CHARS,
                actual_chars,
            });
        }

        let color = if self.color.trim().is_empty() {
            random_palette_color(&mut rand::thread_rng()).to_string()
        } else {
            normalize_color(&self.color)
                .ok_or_else(|| NoteValidationError::InvalidColor(self.color.clone()))?
        };

        let id = match self.id.as_deref().map(str::trim) {
            None => Uuid::new_v4().to_string(),
            Some(value) if value.is_empty() || value.chars().count() > NOTE_ID_MAX_CHARS => {
                return Err(NoteValidationError::InvalidId(value.to_string()));
            }
            Some(value) => value.to_string(),
        };

        if let Some(position) = self.position {
            if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
                return Err(NoteValidationError::NonFinitePosition);
            }
        }

        Ok(NewNote {
            id,
            content: content.to_string(),
            wall: Wall::from_label(self.wall.as_deref()),
            color,
            origin_token: origin_token.to_string(),
            position: self.position,
        })
    }
}

/// Picks one of [`STICKY_NOTE_COLORS`].
pub fn random_palette_color(rng: &mut impl Rng) -> &'static str {
    STICKY_NOTE_COLORS[rng.gen_range(0..STICKY_NOTE_COLORS.len())]
}

/// Returns the canonical color value, or `None` when not accepted.
///
/// Palette tokens are lowercased; hex literals keep their original casing.
pub fn normalize_color(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if PALETTE_TOKENS.contains(&lowered.as_str()) {
        return Some(lowered);
    }
    if HEX_COLOR_RE.is_match(trimmed) {
        return Some(trimmed.to_string());
    }
    None
}
