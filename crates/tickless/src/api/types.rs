use serde::{Deserialize, Serialize};

/// Unique identifier for an entity in the world.
/// Ids are never reused, so a stale timer can't reach a newer entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// A tileset cell, addressed by column and row.
/// This is what a grid cell renders as, and what solidity is decided by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Icon {
    pub col: u32,
    pub row: u32,
}

impl Icon {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

impl From<(u32, u32)> for Icon {
    fn from((col, row): (u32, u32)) -> Self {
        Self { col, row }
    }
}

/// Which movement axis a ray or a collision concerns.
/// `Horizontal` is motion along x (stopped by vertical walls).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Pair of axis flags carried by a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Axes {
    pub horizontal: bool,
    pub vertical: bool,
}

impl Axes {
    pub const NONE: Axes = Axes { horizontal: false, vertical: false };

    pub fn any(self) -> bool {
        self.horizontal || self.vertical
    }

    pub fn set(&mut self, axis: Axis) {
        match axis {
            Axis::Horizontal => self.horizontal = true,
            Axis::Vertical => self.vertical = true,
        }
    }
}

/// Result of unmapping a pixel position onto the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellHit {
    /// Cell column.
    pub x: u32,
    /// Cell row.
    pub y: u32,
    /// Offset inside the cell, in pixels.
    pub local_x: f64,
    pub local_y: f64,
}
