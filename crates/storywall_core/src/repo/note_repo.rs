//! Note store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the note store used by admission and placement.
//! - Offer an atomic insert-if-under-cap path for strict quota enforcement.
//!
//! # Invariants
//! - `list_all` returns notes in insertion order (`seq ASC`).
//! - `create` never overwrites: a reused id fails with `DuplicateId`.
//! - `create_if_under_cap` counts and inserts inside one IMMEDIATE
//!   transaction, so concurrent callers on the same database serialize.

use crate::db::DbError;
use crate::model::note::{NewNote, Note, NotePosition, Wall};
use log::warn;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    content,
    wall,
    color,
    origin_token,
    pos_x,
    pos_y,
    pos_z,
    created_at
FROM notes";

const NOTE_INSERT_SQL: &str = "INSERT INTO notes (
    id,
    content,
    wall,
    color,
    origin_token,
    pos_x,
    pos_y,
    pos_z
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);";

pub type RepoResult<T> = Result<T, RepoError>;

/// Note store failure.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    DuplicateId(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "note id already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::DuplicateId(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Outcome of [`NoteStore::create_if_under_cap`].
#[derive(Debug, Clone, PartialEq)]
pub enum CapInsert {
    Inserted(Note),
    CapReached { existing: u32 },
}

/// Persistence contract consumed by admission and placement.
pub trait NoteStore {
    /// Returns every note in insertion order.
    fn list_all(&self) -> RepoResult<Vec<Note>>;
    /// Returns the earliest note created by `origin_token`, if any.
    fn find_by_origin(&self, origin_token: &str) -> RepoResult<Option<Note>>;
    /// Counts notes created by `origin_token`.
    fn count_by_origin(&self, origin_token: &str) -> RepoResult<u32>;
    /// Inserts one note and returns it with `created_at` assigned.
    fn create(&mut self, note: &NewNote) -> RepoResult<Note>;
    /// Inserts one note only when its origin holds fewer than `cap` notes.
    fn create_if_under_cap(&mut self, note: &NewNote, cap: u32) -> RepoResult<CapInsert>;
}

/// SQLite-backed note store.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_notes_table(conn)?;
        Ok(Self { conn })
    }
}

impl NoteStore for SqliteNoteRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn find_by_origin(&self, origin_token: &str) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL} WHERE origin_token = ?1 ORDER BY seq ASC LIMIT 1;"
        ))?;
        let mut rows = stmt.query([origin_token])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_note_row(row)?)),
            None => Ok(None),
        }
    }

    fn count_by_origin(&self, origin_token: &str) -> RepoResult<u32> {
        Ok(count_by_origin(self.conn, origin_token)?)
    }

    fn create(&mut self, note: &NewNote) -> RepoResult<Note> {
        insert_note(self.conn, note)?;
        load_note(self.conn, &note.id)
    }

    fn create_if_under_cap(&mut self, note: &NewNote, cap: u32) -> RepoResult<CapInsert> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = count_by_origin(&tx, &note.origin_token)?;
        if existing >= cap {
            return Ok(CapInsert::CapReached { existing });
        }

        insert_note(&tx, note)?;
        let created = load_note(&tx, &note.id)?;
        tx.commit()?;
        Ok(CapInsert::Inserted(created))
    }
}

fn count_by_origin(conn: &Connection, origin_token: &str) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM notes WHERE origin_token = ?1;",
        [origin_token],
        |row| row.get(0),
    )
}

fn insert_note(conn: &Connection, note: &NewNote) -> RepoResult<()> {
    let result = conn.execute(
        NOTE_INSERT_SQL,
        params![
            note.id.as_str(),
            note.content.as_str(),
            note.wall.as_str(),
            note.color.as_str(),
            note.origin_token.as_str(),
            note.position.map(|p| p.x),
            note.position.map(|p| p.y),
            note.position.map(|p| p.z),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(failure, _))
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(RepoError::DuplicateId(note.id.clone()))
        }
        Err(err) => Err(err.into()),
    }
}

fn load_note(conn: &Connection, id: &str) -> RepoResult<Note> {
    let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
    stmt.query_row([id], |row| Ok(parse_note_row(row)))
        .optional()?
        .unwrap_or_else(|| {
            Err(RepoError::InvalidData(format!(
                "note `{id}` missing in read-back after insert"
            )))
        })
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: String = row.get("id")?;
    let wall_text: String = row.get("wall")?;
    let wall = Wall::parse(&wall_text).unwrap_or_else(|| {
        warn!(
            "event=note_wall_fallback module=repo status=degraded wall_label_len={} fallback={}",
            wall_text.len(),
            Wall::FALLBACK
        );
        Wall::FALLBACK
    });

    let coords: (Option<f64>, Option<f64>, Option<f64>) =
        (row.get("pos_x")?, row.get("pos_y")?, row.get("pos_z")?);
    let position = match coords {
        (Some(x), Some(y), Some(z)) => Some(NotePosition { x, y, z }),
        (None, None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "partial position in notes row `{id}`"
            )));
        }
    };

    Ok(Note {
        id,
        content: row.get("content")?,
        wall,
        color: row.get("color")?,
        origin_token: row.get("origin_token")?,
        position,
        created_at: row.get("created_at")?,
    })
}

fn ensure_notes_table(conn: &Connection) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'notes'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::InvalidData(
            "notes table missing; open the connection through db::open_db".to_string(),
        ))
    }
}
