//! The authoritative grid of cells.
//!
//! Each cell renders as an [`Icon`]; a cell may additionally be owned by a
//! stateful [`Tile`] kept in an overlay that takes precedence on reads.
//! Solidity is decided by the rendered icon, never by tile identity.
//! Cells are stored in row-major order: index = y * width + x.

use std::collections::{HashMap, HashSet};

use glam::DVec2;

use crate::api::config::WorldConfig;
use crate::api::error::{EngineError, Result};
use crate::api::types::{Axis, CellHit, Icon};
use crate::assets::tileset::Tileset;
use crate::components::tile::Tile;
use crate::core::scheduler::Scheduler;
use crate::core::segments::{Direction, Segment, SegmentCache};
use crate::core::world::WorldEvent;

/// Default tolerance for flush contacts and segment end insets, in pixels.
pub const DEFAULT_FUDGE_FACTOR: f64 = 0.001;

/// Reject maps whose cell count does not fit the `u32` cell index.
pub fn check_map_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(EngineError::EmptyMap);
    }
    match width.checked_mul(height) {
        Some(_) => Ok(()),
        None => Err(EngineError::MapTooLarge { width: width as usize, height: height as usize }),
    }
}

/// The fudge must be positive and smaller than half a cell, otherwise the
/// segment inset swallows whole edges.
pub fn check_fudge_factor(fudge_factor: f64, tileset: &Tileset) -> Result<()> {
    let (cell_width, cell_height) = tileset.cell_size();
    let limit = cell_width.min(cell_height) / 2.0;
    if fudge_factor > 0.0 && fudge_factor < limit {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter { name: "fudge_factor", value: fudge_factor })
    }
}

/// A value to write into a cell.
#[derive(Debug)]
pub enum Cell {
    Icon(Icon),
    Tile(Tile),
}

impl From<Icon> for Cell {
    fn from(icon: Icon) -> Self {
        Cell::Icon(icon)
    }
}

impl From<Tile> for Cell {
    fn from(tile: Tile) -> Self {
        Cell::Tile(tile)
    }
}

/// What a cell currently holds.
#[derive(Debug, Clone, Copy)]
pub enum CellRef<'a> {
    Icon(Icon),
    Tile(&'a Tile),
}

#[derive(Debug)]
pub struct Grid {
    width: u32,
    height: u32,
    tileset: Tileset,
    /// Base layer. `None` only while a tile is being attached.
    icons: Vec<Option<Icon>>,
    tiles: HashMap<(u32, u32), Tile>,
    solid: HashSet<Icon>,
    default_icon: Icon,
    fudge_factor: f64,
    cache: SegmentCache,
}

impl Grid {
    /// Create a grid filled with `default_icon`.
    pub fn new(
        width: u32,
        height: u32,
        tileset: Tileset,
        default_icon: Icon,
        solid: impl IntoIterator<Item = Icon>,
    ) -> Result<Self> {
        check_map_size(width, height)?;
        tileset.validate()?;
        tileset.check_icon(default_icon)?;
        Ok(Self {
            width,
            height,
            tileset,
            icons: vec![Some(default_icon); (width * height) as usize],
            tiles: HashMap::new(),
            solid: solid.into_iter().collect(),
            default_icon,
            fudge_factor: DEFAULT_FUDGE_FACTOR,
            cache: SegmentCache::new(),
        })
    }

    /// Build a grid from already-parsed map rows (`rows[y][x]`).
    /// Every row must have the same, non-zero length.
    pub fn from_rows(
        rows: &[Vec<Icon>],
        tileset: Tileset,
        solid: impl IntoIterator<Item = Icon>,
    ) -> Result<Self> {
        let first = rows.first().ok_or(EngineError::EmptyMap)?;
        let expected = first.len();
        if expected == 0 {
            return Err(EngineError::EmptyMap);
        }
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(EngineError::RaggedMap { row, len: cells.len(), expected });
            }
            for &icon in cells {
                tileset.check_icon(icon)?;
            }
        }
        let too_large = || EngineError::MapTooLarge { width: expected, height: rows.len() };
        let width = u32::try_from(expected).map_err(|_| too_large())?;
        let height = u32::try_from(rows.len()).map_err(|_| too_large())?;
        let mut grid = Self::new(width, height, tileset, first[0], solid)?;
        grid.icons = rows.iter().flatten().map(|&icon| Some(icon)).collect();
        Ok(grid)
    }

    /// Build an empty grid as described by a world config.
    pub fn from_config(config: &WorldConfig) -> Result<Self> {
        let mut grid = Self::new(
            config.width,
            config.height,
            config.tileset,
            config.default_icon,
            config.solid_icons.iter().copied(),
        )?;
        grid.with_fudge_factor(config.fudge_factor)
    }

    pub fn with_fudge_factor(mut self, fudge_factor: f64) -> Result<Self> {
        check_fudge_factor(fudge_factor, &self.tileset)?;
        self.fudge_factor = fudge_factor;
        Ok(self)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tileset(&self) -> &Tileset {
        &self.tileset
    }

    pub fn default_icon(&self) -> Icon {
        self.default_icon
    }

    pub fn fudge_factor(&self) -> f64 {
        self.fudge_factor
    }

    /// Cell size in pixels.
    pub fn cell_size(&self) -> DVec2 {
        let (w, h) = self.tileset.cell_size();
        DVec2::new(w, h)
    }

    /// Whole grid size in pixels.
    pub fn pixel_size(&self) -> DVec2 {
        self.cell_size() * DVec2::new(self.width as f64, self.height as f64)
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    pub fn check_bounds(&self, x: u32, y: u32) -> Result<()> {
        if self.in_bounds(x as i64, y as i64) {
            Ok(())
        } else {
            Err(EngineError::OutOfBounds { x: x as i64, y: y as i64 })
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// Overlay tile if present, else the base icon. `None` out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<CellRef<'_>> {
        if !self.in_bounds(x as i64, y as i64) {
            return None;
        }
        if let Some(tile) = self.tiles.get(&(x, y)) {
            return Some(CellRef::Tile(tile));
        }
        self.icons[self.index(x, y)].map(CellRef::Icon)
    }

    /// The icon a cell renders as, whether or not a tile owns it.
    pub fn icon(&self, x: u32, y: u32) -> Option<Icon> {
        if !self.in_bounds(x as i64, y as i64) {
            return None;
        }
        self.icons[self.index(x, y)]
    }

    pub fn tile(&self, x: u32, y: u32) -> Option<&Tile> {
        self.tiles.get(&(x, y))
    }

    pub fn is_icon_solid(&self, icon: Icon) -> bool {
        self.solid.contains(&icon)
    }

    /// Out-of-bounds cells are solid; in-bounds cells are solid when their
    /// rendered icon is.
    pub fn is_solid(&self, x: i64, y: i64) -> bool {
        if !self.in_bounds(x, y) {
            return true;
        }
        self.icons[self.index(x as u32, y as u32)].is_some_and(|icon| self.solid.contains(&icon))
    }

    /// Map a pixel position (grid-relative) to a cell and an in-cell offset.
    pub fn unmap(&self, px: f64, py: f64) -> Option<CellHit> {
        if px < 0.0 || py < 0.0 {
            return None;
        }
        let (cx, cy, local_x, local_y) = self.tileset.unmap(px, py);
        if !self.in_bounds(cx, cy) {
            return None;
        }
        Some(CellHit { x: cx as u32, y: cy as u32, local_x, local_y })
    }

    pub fn is_cache_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    /// Rebuild the segment cache if any cell changed since the last build.
    pub fn ensure_cache(&mut self) {
        if !self.cache.is_dirty() {
            return;
        }
        let (width, icons, solid) = (self.width, &self.icons, &self.solid);
        self.cache.rebuild(self.width, self.height, self.tileset.cell_size(), |x, y| {
            icons[(y * width + x) as usize].is_some_and(|icon| solid.contains(&icon))
        });
    }

    /// Cached boundary segments facing `direction`, rebuilt first if stale.
    pub fn segments(&mut self, direction: Direction) -> &[Segment] {
        self.ensure_cache();
        self.cache.bucket(direction)
    }

    /// Distance from `origin` along unit `direction` to the first wall hit
    /// while moving on `axis`; infinity when nothing is hit.
    pub fn ray_cast(&mut self, origin: DVec2, direction: DVec2, axis: Axis, fudge: f64) -> f64 {
        self.ensure_cache();
        self.cache.ray_cast(origin, direction, axis, fudge)
    }

    /// Visit every cell that has an icon, in row-major order.
    pub fn icons(&self) -> impl Iterator<Item = (u32, u32, Icon)> + '_ {
        self.icons.iter().enumerate().filter_map(move |(i, icon)| {
            let i = i as u32;
            icon.map(|icon| (i % self.width, i / self.width, icon))
        })
    }

    // -- Crate-internal mutation; the world pairs these with invalidate() --

    pub(crate) fn write_icon(&mut self, x: u32, y: u32, icon: Option<Icon>) {
        let index = self.index(x, y);
        self.icons[index] = icon;
    }

    pub(crate) fn take_tile(&mut self, x: u32, y: u32) -> Option<Tile> {
        self.tiles.remove(&(x, y))
    }

    pub(crate) fn insert_tile(&mut self, x: u32, y: u32, tile: Tile) {
        self.tiles.insert((x, y), tile);
    }

    /// Mark the segment cache stale. The first invalidation of a clean cache
    /// queues one map-changed broadcast for the next scheduler turn.
    pub(crate) fn invalidate(&mut self, scheduler: &mut Scheduler<WorldEvent>) {
        if self.cache.mark_dirty() {
            scheduler.on_next(WorldEvent::MapChanged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: Icon = Icon::new(1, 0);
    const WALL: Icon = Icon::new(0, 0);

    fn grid(w: u32, h: u32) -> Grid {
        Grid::new(w, h, Tileset::default(), FLOOR, [WALL]).unwrap()
    }

    #[test]
    fn out_of_bounds_is_solid() {
        let g = grid(3, 3);
        assert!(g.is_solid(-1, 0));
        assert!(g.is_solid(0, 3));
        assert!(!g.is_solid(1, 1));
    }

    #[test]
    fn solidity_follows_the_icon() {
        let mut g = grid(3, 3);
        g.write_icon(1, 1, Some(WALL));
        assert!(g.is_solid(1, 1));
        assert!(matches!(g.get(1, 1), Some(CellRef::Icon(WALL))));
    }

    #[test]
    fn from_rows_rejects_empty_and_ragged() {
        assert!(matches!(
            Grid::from_rows(&[], Tileset::default(), [WALL]),
            Err(EngineError::EmptyMap)
        ));
        let rows = vec![vec![FLOOR, FLOOR], vec![FLOOR]];
        assert!(matches!(
            Grid::from_rows(&rows, Tileset::default(), [WALL]),
            Err(EngineError::RaggedMap { row: 1, len: 1, expected: 2 })
        ));
    }

    #[test]
    fn oversized_map_is_an_error() {
        assert!(matches!(
            Grid::new(100_000, 100_000, Tileset::default(), FLOOR, [WALL]),
            Err(EngineError::MapTooLarge { width: 100_000, height: 100_000 })
        ));
        assert!(check_map_size(65_536, 65_535).is_ok());
        assert!(check_map_size(65_536, 65_536).is_err());
    }

    #[test]
    fn fudge_factor_must_fit_inside_half_a_cell() {
        for bad in [0.0, -0.5, 16.0, 40.0, f64::NAN] {
            assert!(
                matches!(
                    grid(2, 2).with_fudge_factor(bad),
                    Err(EngineError::InvalidParameter { name: "fudge_factor", .. })
                ),
                "accepted {}",
                bad
            );
        }
        let g = grid(2, 2).with_fudge_factor(0.5).unwrap();
        assert_eq!(g.fudge_factor(), 0.5);
    }

    #[test]
    fn from_rows_keeps_layout() {
        let rows = vec![vec![WALL, FLOOR, FLOOR], vec![FLOOR, FLOOR, WALL]];
        let g = Grid::from_rows(&rows, Tileset::default(), [WALL]).unwrap();
        assert_eq!((g.width(), g.height()), (3, 2));
        assert_eq!(g.icon(2, 1), Some(WALL));
        assert_eq!(g.icon(1, 0), Some(FLOOR));
    }

    #[test]
    fn from_rows_rejects_icons_outside_tileset() {
        let rows = vec![vec![Icon::new(9, 9)]];
        assert!(matches!(
            Grid::from_rows(&rows, Tileset::default(), [WALL]),
            Err(EngineError::IconOutOfTileset(_))
        ));
    }

    #[test]
    fn unmap_inside_and_outside() {
        let g = grid(4, 4);
        let hit = g.unmap(40.0, 70.0).unwrap();
        assert_eq!((hit.x, hit.y), (1, 2));
        assert_eq!((hit.local_x, hit.local_y), (8.0, 6.0));
        assert!(g.unmap(-1.0, 5.0).is_none());
        assert!(g.unmap(128.0, 5.0).is_none());
    }

    #[test]
    fn ray_cast_rebuilds_a_dirty_cache() {
        let mut g = grid(4, 1);
        assert!(g.is_cache_dirty());
        g.write_icon(3, 0, Some(WALL));
        let d = g.ray_cast(DVec2::new(16.0, 16.0), DVec2::X, Axis::Horizontal, 0.001);
        assert!(!g.is_cache_dirty());
        assert!((d - 80.0).abs() < 1e-9, "distance was {}", d);
    }

    #[test]
    fn open_grid_has_no_segments() {
        let mut g = grid(5, 5);
        for d in Direction::ALL {
            assert!(g.segments(d).is_empty());
        }
    }

    #[test]
    fn icons_iterates_row_major() {
        let g = grid(2, 2);
        let cells: Vec<_> = g.icons().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(cells, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }
}
