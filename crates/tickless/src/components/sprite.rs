use glam::DVec2;

use crate::components::entity::{Component, Dispatch, EntityState, EntityView, MessageKind};
use crate::renderer::traits::{Rect, Renderer};

/// Identifies which texture atlas a sprite belongs to.
/// Atlases are loaded by the host; the kernel only passes the index along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AtlasId(pub u32);

/// Which part of an atlas to draw for an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteComponent {
    /// Which atlas this sprite belongs to.
    pub atlas: AtlasId,
    /// Column in the atlas grid.
    pub col: f32,
    /// Row in the atlas grid.
    pub row: f32,
    /// Opacity (0.0 = invisible, 1.0 = opaque).
    pub alpha: f32,
}

impl SpriteComponent {
    pub fn new(atlas: AtlasId, col: f32, row: f32) -> Self {
        Self { atlas, col, row, alpha: 1.0 }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

impl Default for SpriteComponent {
    fn default() -> Self {
        Self {
            atlas: AtlasId(0),
            col: 0.0,
            row: 0.0,
            alpha: 1.0,
        }
    }
}

/// Draws a sprite centred on the entity and defines its bounding box.
#[derive(Debug, Clone, Copy)]
pub struct RenderImage {
    sprite: SpriteComponent,
    size: DVec2,
}

impl RenderImage {
    pub fn new(sprite: SpriteComponent, size: DVec2) -> Self {
        Self { sprite, size }
    }
}

impl Component for RenderImage {
    fn handles(&self) -> &'static [MessageKind] {
        &[MessageKind::Size, MessageKind::Render]
    }

    fn size(&self, _state: &EntityState) -> Option<DVec2> {
        Some(self.size)
    }

    fn render(
        &self,
        view: &EntityView<'_>,
        renderer: &mut dyn Renderer,
        offset: DVec2,
        now: f64,
    ) -> Dispatch {
        let Some(pos) = view.position(now) else {
            return Dispatch::NotHandled;
        };
        let corner = pos + offset - self.size / 2.0;
        renderer.draw_sprite(&self.sprite, Rect::new(corner, self.size));
        Dispatch::Handled
    }
}
