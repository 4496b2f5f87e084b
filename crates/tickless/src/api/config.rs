use serde::{Deserialize, Serialize};

use crate::api::error::{EngineError, Result};
use crate::api::types::Icon;
use crate::assets::tileset::Tileset;
use crate::components::kinematics::Controllable;
use crate::core::grid::{check_fudge_factor, check_map_size, DEFAULT_FUDGE_FACTOR};

/// World configuration. Loaded from JSON by the host, or built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Icon every cell starts with.
    #[serde(default)]
    pub default_icon: Icon,
    /// Icons that block movement.
    #[serde(default)]
    pub solid_icons: Vec<Icon>,
    #[serde(default)]
    pub tileset: Tileset,
    /// Pixel size of the loaded tileset image as `[width, height]`,
    /// checked against the tileset grid when present.
    #[serde(default)]
    pub image_size: Option<[u32; 2]>,
    /// Contact and segment-inset tolerance, in pixels.
    #[serde(default = "default_fudge_factor")]
    pub fudge_factor: f64,
    /// Speed of controllable entities, in pixels per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f64,
}

fn default_fudge_factor() -> f64 {
    DEFAULT_FUDGE_FACTOR
}

fn default_move_speed() -> f64 {
    64.0
}

impl WorldConfig {
    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_map_size(self.width, self.height)?;
        self.tileset.validate()?;
        if let Some([width, height]) = self.image_size {
            self.tileset.check_image_size(width, height)?;
        }
        self.tileset.check_icon(self.default_icon)?;
        for &icon in &self.solid_icons {
            self.tileset.check_icon(icon)?;
        }
        check_fudge_factor(self.fudge_factor, &self.tileset)?;
        check_non_negative("move_speed", self.move_speed)?;
        Ok(())
    }

    /// A [`Controllable`] moving at the configured speed.
    pub fn controllable(&self) -> Controllable {
        Controllable::new(self.move_speed)
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter { name, value })
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 19,
            height: 14,
            default_icon: Icon::new(1, 0),
            solid_icons: vec![Icon::new(0, 0), Icon::new(2, 0)],
            tileset: Tileset::default(),
            image_size: Some([128, 128]),
            fudge_factor: DEFAULT_FUDGE_FACTOR,
            move_speed: 64.0,
        }
    }
}
