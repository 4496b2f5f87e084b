//! Drawing contract between the kernel and whatever presents it.
//!
//! The kernel never owns a window or a GPU. It describes a frame as a
//! sequence of calls on a [`Renderer`]: grid cells as tileset icons,
//! entities as atlas sprites, and optional debug lines. Backends (a canvas,
//! a GPU batcher, the bundled [`RenderBuffer`](super::instance::RenderBuffer))
//! implement it.

use glam::DVec2;

use crate::api::types::Icon;
use crate::components::sprite::SpriteComponent;

/// Axis-aligned screen rectangle in pixels; `min` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: DVec2,
    pub size: DVec2,
}

impl Rect {
    pub fn new(min: DVec2, size: DVec2) -> Self {
        Self { min, size }
    }

    pub fn max(&self) -> DVec2 {
        self.min + self.size
    }

    pub fn center(&self) -> DVec2 {
        self.min + self.size / 2.0
    }
}

/// Receives one frame's worth of draw calls, in painter's order.
pub trait Renderer {
    /// Draw a tileset cell.
    fn draw_icon(&mut self, icon: Icon, rect: Rect);

    /// Draw an atlas sprite.
    fn draw_sprite(&mut self, sprite: &SpriteComponent, rect: Rect);

    /// Draw a one-pixel debug line. `color` is 8-bit RGB.
    fn draw_line(&mut self, from: DVec2, to: DVec2, color: [u8; 3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_corners() {
        let r = Rect::new(DVec2::new(10.0, 20.0), DVec2::new(4.0, 6.0));
        assert_eq!(r.max(), DVec2::new(14.0, 26.0));
        assert_eq!(r.center(), DVec2::new(12.0, 23.0));
    }
}
