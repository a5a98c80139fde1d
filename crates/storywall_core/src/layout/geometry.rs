//! Room geometry: maps grid cells to points on a wall's interior face.

use crate::model::note::Wall;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Grid row rendered at wall mid-height; lower rows sit below it.
const CENTER_ROW: f64 = 2.0;

/// 3-component vector in room space (x right, y up, z toward the viewer).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Size of the room and of the notes pinned inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomDimensions {
    /// Edge length of the square floor; walls sit at `±size / 2`.
    pub size: f64,
    /// Wall height; the floor sits at `-height / 2`.
    pub height: f64,
    /// Edge length of one square note.
    pub note_size: f64,
    /// Empty space between neighbouring slots.
    pub slot_gap: f64,
    /// Distance between a note and its wall, so it renders in front of it.
    pub wall_inset: f64,
}

impl Default for RoomDimensions {
    fn default() -> Self {
        Self {
            size: 100.0,
            height: 50.0,
            note_size: 2.0,
            slot_gap: 0.5,
            wall_inset: 0.1,
        }
    }
}

impl RoomDimensions {
    /// Center-to-center distance between neighbouring slots.
    pub fn slot_spacing(&self) -> f64 {
        self.note_size + self.slot_gap
    }

    /// World-space position of a grid cell on `wall`.
    ///
    /// Columns are centered on the wall midpoint; the wall selects which axes
    /// carry column/row and which fixed coordinate holds the note flush
    /// against the wall's interior face.
    pub fn slot_position(&self, wall: Wall, column: u32, row: u32, grid_columns: u32) -> Vec3 {
        let spacing = self.slot_spacing();
        let across = (f64::from(column) - f64::from(grid_columns) / 2.0) * spacing;
        let along = (f64::from(row) - CENTER_ROW) * spacing;
        let half = self.size / 2.0;

        match wall {
            Wall::Back => Vec3::new(across, along, -half + self.wall_inset),
            Wall::Front => Vec3::new(across, along, half - self.wall_inset),
            Wall::Left => Vec3::new(-half + self.wall_inset, along, across),
            Wall::Right => Vec3::new(half - self.wall_inset, along, across),
            Wall::Floor => Vec3::new(across, -self.height / 2.0 + self.wall_inset, along),
        }
    }
}

/// Euler rotation (radians) facing a note into the room, plus `tilt` around
/// its own normal.
pub fn wall_rotation(wall: Wall, tilt: f64) -> Vec3 {
    match wall {
        Wall::Back => Vec3::new(0.0, 0.0, tilt),
        Wall::Front => Vec3::new(0.0, PI, tilt),
        Wall::Left => Vec3::new(0.0, FRAC_PI_2, tilt),
        Wall::Right => Vec3::new(0.0, -FRAC_PI_2, tilt),
        Wall::Floor => Vec3::new(-FRAC_PI_2, 0.0, tilt),
    }
}
