use bytemuck::{Pod, Zeroable};
use glam::DVec2;

use crate::api::types::Icon;
use crate::components::sprite::SpriteComponent;
use crate::renderer::traits::{Rect, Renderer};

/// Per-instance render data, ready to upload as-is.
/// 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct RenderInstance {
    /// Top-left X in screen pixels.
    pub x: f32,
    /// Top-left Y in screen pixels.
    pub y: f32,
    /// Rendered width in pixels.
    pub width: f32,
    /// Rendered height in pixels.
    pub height: f32,
    /// Atlas index. Tileset icons always use 0.
    pub atlas: f32,
    /// Atlas column.
    pub col: f32,
    /// Atlas row.
    pub row: f32,
    /// Opacity (0.0 = invisible, 1.0 = opaque).
    pub alpha: f32,
}

impl RenderInstance {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;

    fn from_rect(rect: Rect, atlas: u32, col: f32, row: f32, alpha: f32) -> Self {
        Self {
            x: rect.min.x as f32,
            y: rect.min.y as f32,
            width: rect.size.x as f32,
            height: rect.size.y as f32,
            atlas: atlas as f32,
            col,
            row,
            alpha,
        }
    }
}

/// A debug line segment. 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct DebugLine {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Color channels, 0.0-1.0.
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Collects a frame's draw calls into flat instance arrays.
///
/// Tileset icons and sprites are kept apart so a backend can draw each
/// with one batch: `instances[..tile_split]` are icons, the rest sprites.
#[derive(Debug, Clone, Default)]
pub struct RenderBuffer {
    tiles: Vec<RenderInstance>,
    sprites: Vec<RenderInstance>,
    lines: Vec<DebugLine>,
}

impl RenderBuffer {
    pub fn new() -> Self {
        Self {
            tiles: Vec::with_capacity(512),
            sprites: Vec::with_capacity(64),
            lines: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
        self.sprites.clear();
        self.lines.clear();
    }

    /// All instances, icons first.
    pub fn instances(&self) -> impl Iterator<Item = &RenderInstance> {
        self.tiles.iter().chain(self.sprites.iter())
    }

    pub fn tiles(&self) -> &[RenderInstance] {
        &self.tiles
    }

    pub fn sprites(&self) -> &[RenderInstance] {
        &self.sprites
    }

    pub fn lines(&self) -> &[DebugLine] {
        &self.lines
    }

    /// Index where sprites start in [`RenderBuffer::instances`].
    pub fn tile_split(&self) -> u32 {
        self.tiles.len() as u32
    }

    pub fn instance_count(&self) -> u32 {
        (self.tiles.len() + self.sprites.len()) as u32
    }

    /// Raw bytes of the icon instances for upload.
    pub fn tile_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tiles)
    }

    /// Raw bytes of the sprite instances for upload.
    pub fn sprite_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.sprites)
    }

    pub fn line_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lines)
    }
}

impl Renderer for RenderBuffer {
    fn draw_icon(&mut self, icon: Icon, rect: Rect) {
        self.tiles
            .push(RenderInstance::from_rect(rect, 0, icon.col as f32, icon.row as f32, 1.0));
    }

    fn draw_sprite(&mut self, sprite: &SpriteComponent, rect: Rect) {
        self.sprites
            .push(RenderInstance::from_rect(rect, sprite.atlas.0, sprite.col, sprite.row, sprite.alpha));
    }

    fn draw_line(&mut self, from: DVec2, to: DVec2, color: [u8; 3]) {
        let [r, g, b] = color.map(|c| c as f32 / 255.0);
        self.lines.push(DebugLine {
            x0: from.x as f32,
            y0: from.y as f32,
            x1: to.x as f32,
            y1: to.y as f32,
            r,
            g,
            b,
            a: 1.0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::sprite::AtlasId;

    #[test]
    fn instances_are_8_floats() {
        assert_eq!(std::mem::size_of::<RenderInstance>(), 32);
        assert_eq!(std::mem::size_of::<DebugLine>(), 32);
        assert_eq!(RenderInstance::FLOATS, 8);
    }

    #[test]
    fn icons_come_before_sprites() {
        let mut buf = RenderBuffer::new();
        let rect = Rect::new(DVec2::new(32.0, 64.0), DVec2::splat(32.0));
        buf.draw_sprite(&SpriteComponent::new(AtlasId(1), 2.0, 0.0), rect);
        buf.draw_icon(Icon::new(3, 1), rect);
        assert_eq!(buf.instance_count(), 2);
        assert_eq!(buf.tile_split(), 1);
        let first = buf.instances().next().unwrap();
        assert_eq!((first.col, first.row, first.atlas), (3.0, 1.0, 0.0));
        assert_eq!(buf.sprites()[0].atlas, 1.0);
        assert_eq!(buf.tile_bytes().len(), RenderInstance::STRIDE_BYTES);
    }

    #[test]
    fn lines_normalize_color() {
        let mut buf = RenderBuffer::new();
        buf.draw_line(DVec2::ZERO, DVec2::new(10.0, 0.0), [255, 0, 51]);
        let line = buf.lines()[0];
        assert_eq!((line.r, line.g, line.b, line.a), (1.0, 0.0, 0.2, 1.0));
        buf.clear();
        assert!(buf.lines().is_empty());
    }
}
