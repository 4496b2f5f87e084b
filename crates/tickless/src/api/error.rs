use thiserror::Error;

use crate::api::types::Icon;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Everything the kernel can refuse.
///
/// Configuration errors surface while loading, before the first pump.
/// Programming errors mean a component, tile or caller broke a contract.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid world config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("tileset image is {actual_width}x{actual_height} px, expected {expected_width}x{expected_height}")]
    TilesetMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("tileset has a zero dimension")]
    EmptyTileset,

    #[error("tileset of {cols}x{rows} cells of {cell_width}x{cell_height} px does not fit in u32 pixels")]
    TilesetTooLarge { cols: u32, rows: u32, cell_width: u32, cell_height: u32 },

    #[error("icon ({}, {}) is outside the tileset", .0.col, .0.row)]
    IconOutOfTileset(Icon),

    #[error("{name} is out of range: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("map cannot be empty")]
    EmptyMap,

    #[error("map of {width}x{height} cells is too large")]
    MapTooLarge { width: usize, height: usize },

    #[error("map row {row} has {len} cells, expected {expected}")]
    RaggedMap { row: usize, len: usize, expected: usize },

    #[error("cell ({x}, {y}) is outside the grid")]
    OutOfBounds { x: i64, y: i64 },

    #[error("entity has no position-providing component")]
    NoPositionProvider,

    #[error("tile at ({x}, {y}) attached without publishing an icon")]
    TileWithoutIcon { x: u32, y: u32 },
}
