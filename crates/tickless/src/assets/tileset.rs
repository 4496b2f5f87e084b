use serde::{Deserialize, Serialize};

use crate::api::error::{EngineError, Result};
use crate::api::types::Icon;

/// Describes the tileset atlas: a grid of equally sized cells.
/// Image loading lives outside the kernel; only the geometry is kept here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    /// Number of columns in the atlas grid.
    pub cols: u32,
    /// Number of rows in the atlas grid.
    pub rows: u32,
    /// Cell width in pixels.
    #[serde(default = "default_cell")]
    pub cell_width: u32,
    /// Cell height in pixels.
    #[serde(default = "default_cell")]
    pub cell_height: u32,
}

fn default_cell() -> u32 {
    32
}

impl Tileset {
    pub fn new(cols: u32, rows: u32, cell_width: u32, cell_height: u32) -> Result<Self> {
        let tileset = Self { cols, rows, cell_width, cell_height };
        tileset.validate()?;
        Ok(tileset)
    }

    /// Reject degenerate atlases.
    pub fn validate(&self) -> Result<()> {
        if self.cols == 0 || self.rows == 0 || self.cell_width == 0 || self.cell_height == 0 {
            return Err(EngineError::EmptyTileset);
        }
        self.image_size().map(|_| ())
    }

    /// Pixel size of the whole atlas image as `(width, height)`.
    pub fn image_size(&self) -> Result<(u32, u32)> {
        let too_large = || EngineError::TilesetTooLarge {
            cols: self.cols,
            rows: self.rows,
            cell_width: self.cell_width,
            cell_height: self.cell_height,
        };
        let width = self.cols.checked_mul(self.cell_width).ok_or_else(too_large)?;
        let height = self.rows.checked_mul(self.cell_height).ok_or_else(too_large)?;
        Ok((width, height))
    }

    /// Check the loaded image's pixel size against the declared grid.
    pub fn check_image_size(&self, width: u32, height: u32) -> Result<()> {
        let (expected_width, expected_height) = self.image_size()?;
        if width != expected_width || height != expected_height {
            return Err(EngineError::TilesetMismatch {
                expected_width,
                expected_height,
                actual_width: width,
                actual_height: height,
            });
        }
        Ok(())
    }

    pub fn contains(&self, icon: Icon) -> bool {
        icon.col < self.cols && icon.row < self.rows
    }

    pub fn check_icon(&self, icon: Icon) -> Result<Icon> {
        if self.contains(icon) {
            Ok(icon)
        } else {
            Err(EngineError::IconOutOfTileset(icon))
        }
    }

    /// Icon for a linear atlas index (row-major).
    pub fn icon_at(&self, index: u32) -> Icon {
        Icon::new(index % self.cols, index / self.cols)
    }

    /// Cell size in pixels as `(width, height)`.
    pub fn cell_size(&self) -> (f64, f64) {
        (self.cell_width as f64, self.cell_height as f64)
    }

    /// Split a non-negative pixel position into cell and in-cell offset.
    pub fn unmap(&self, px: f64, py: f64) -> (i64, i64, f64, f64) {
        let (cw, ch) = self.cell_size();
        let cx = (px / cw).floor();
        let cy = (py / ch).floor();
        (cx as i64, cy as i64, px - cx * cw, py - cy * ch)
    }
}

impl Default for Tileset {
    fn default() -> Self {
        Self {
            cols: 4,
            rows: 4,
            cell_width: 32,
            cell_height: 32,
        }
    }
}
