//! Planetarium dome model

use serde::{Deserialize, Serialize};

/// A hall with a fixed seating grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanetariumDome {
    pub id: i64,
    /// Unique name
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl PlanetariumDome {
    pub fn new(name: String, rows: i32, seats_in_row: i32) -> Self {
        Self {
            id: 0,
            name,
            rows,
            seats_in_row,
        }
    }

    /// Total number of seats
    pub fn capacity(&self) -> i64 {
        self.rows as i64 * self.seats_in_row as i64
    }

    /// Whether `(row, seat)` lies inside the seating grid (1-based)
    pub fn contains_seat(&self, row: i32, seat: i32) -> bool {
        (1..=self.rows).contains(&row) && (1..=self.seats_in_row).contains(&seat)
    }
}

/// Input for creating a dome
#[derive(Debug, Clone)]
pub struct CreatePlanetariumDomeInput {
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}
