//! Placement engine: maps the note stream onto wall grid slots.
//!
//! # Responsibility
//! - Assign each note a `(column, row)` slot on its wall by arrival order.
//! - Derive world-space position and rotation for rendering.
//!
//! # Invariants
//! - Notes sharing a wall never share a slot.
//! - Slot assignment depends only on `(wall, arrival index within wall)`;
//!   appending notes never moves earlier ones.
//! - Tilt comes from an injected [`TiltSource`] and never affects slots.
//! - No I/O, no errors, no shared state: safe to call from any thread.

pub mod geometry;
pub mod tilt;

pub use geometry::{wall_rotation, RoomDimensions, Vec3};
pub use tilt::{NoTilt, RandomTilt, TiltSource, MAX_TILT_RADIANS};

use crate::model::note::{Note, Wall};
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroU32;

/// Deterministic slot for one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSlot {
    pub wall: Wall,
    /// Zero-based arrival index within the wall.
    pub grid_index: u32,
    pub grid_column: u32,
    pub grid_row: u32,
}

/// Full placement of one note.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssignment {
    pub note_id: String,
    pub wall: Wall,
    pub grid_column: u32,
    pub grid_row: u32,
    pub world_position: Vec3,
    pub rotation: Vec3,
}

/// Placement of a whole note collection, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    assignments: Vec<SlotAssignment>,
    by_id: HashMap<String, usize>,
}

impl Layout {
    /// Assignment for `note_id`; the first occurrence wins if ids repeat.
    pub fn get(&self, note_id: &str) -> Option<&SlotAssignment> {
        self.by_id.get(note_id).map(|&idx| &self.assignments[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotAssignment> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn into_assignments(self) -> Vec<SlotAssignment> {
        self.assignments
    }
}

/// Assigns grid slots by arrival order within each wall.
///
/// Output is parallel to `notes`.
pub fn compute_slots(notes: &[Note], grid_columns: NonZeroU32) -> Vec<GridSlot> {
    let columns = grid_columns.get();
    let mut next_index: HashMap<Wall, u32> = HashMap::new();

    notes
        .iter()
        .map(|note| {
            let counter = next_index.entry(note.wall).or_insert(0);
            let grid_index = *counter;
            *counter += 1;
            GridSlot {
                wall: note.wall,
                grid_index,
                grid_column: grid_index % columns,
                grid_row: grid_index / columns,
            }
        })
        .collect()
}

/// Computes slots, world positions, and rotations for every note.
pub fn compute_layout(
    notes: &[Note],
    grid_columns: NonZeroU32,
    room: &RoomDimensions,
    tilt: &mut impl TiltSource,
) -> Layout {
    let slots = compute_slots(notes, grid_columns);
    let mut layout = Layout {
        assignments: Vec::with_capacity(notes.len()),
        by_id: HashMap::with_capacity(notes.len()),
    };

    for (note, slot) in notes.iter().zip(slots) {
        let world_position =
            room.slot_position(slot.wall, slot.grid_column, slot.grid_row, grid_columns.get());
        let rotation = wall_rotation(slot.wall, tilt.next_tilt());
        layout
            .by_id
            .entry(note.id.clone())
            .or_insert(layout.assignments.len());
        layout.assignments.push(SlotAssignment {
            note_id: note.id.clone(),
            wall: slot.wall,
            grid_column: slot.grid_column,
            grid_row: slot.grid_row,
            world_position,
            rotation,
        });
    }

    layout
}
