//! Debug rendering: opt-in wall-segment visualization.
//!
//! Call `World::debug_draw()` after `World::render()` to see which edges
//! the collision predictor casts against.

use glam::DVec2;

use crate::core::grid::Grid;
use crate::core::segments::Direction;
use crate::renderer::traits::Renderer;

/// Line color per facing direction: up green, down blue, left red, right yellow.
pub const DIRECTION_COLORS: [[u8; 3]; 4] = [[0, 255, 0], [0, 0, 255], [255, 0, 0], [255, 255, 0]];

pub fn direction_color(direction: Direction) -> [u8; 3] {
    DIRECTION_COLORS[direction.index()]
}

/// Draw every cached boundary segment, rebuilding the cache first if stale.
pub fn debug_draw_segments(grid: &mut Grid, renderer: &mut dyn Renderer, offset: DVec2) {
    for direction in Direction::ALL {
        let color = direction_color(direction);
        for segment in grid.segments(direction) {
            let (from, to) = if direction.is_horizontal_line() {
                (DVec2::new(segment.min, segment.fixed), DVec2::new(segment.max, segment.fixed))
            } else {
                (DVec2::new(segment.fixed, segment.min), DVec2::new(segment.fixed, segment.max))
            };
            renderer.draw_line(offset + from, offset + to, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Icon;
    use crate::assets::tileset::Tileset;
    use crate::renderer::instance::RenderBuffer;

    #[test]
    fn one_block_draws_four_edges() {
        let wall = Icon::new(0, 0);
        let floor = Icon::new(1, 0);
        let rows = vec![vec![floor, floor, floor], vec![floor, wall, floor], vec![floor, floor, floor]];
        let mut grid = Grid::from_rows(&rows, Tileset::default(), [wall]).unwrap();
        let mut buffer = RenderBuffer::new();
        debug_draw_segments(&mut grid, &mut buffer, DVec2::ZERO);

        let lines = buffer.lines();
        assert_eq!(lines.len(), 4);
        // Up-facing edge first, green, along y = 32.
        assert_eq!((lines[0].x0, lines[0].y0, lines[0].x1, lines[0].y1), (32.0, 32.0, 64.0, 32.0));
        assert_eq!((lines[0].r, lines[0].g, lines[0].b), (0.0, 1.0, 0.0));
        // Right-facing edge last, yellow, along x = 64.
        assert_eq!((lines[3].x0, lines[3].y0, lines[3].x1, lines[3].y1), (64.0, 32.0, 64.0, 64.0));
        assert_eq!((lines[3].r, lines[3].g, lines[3].b), (1.0, 1.0, 0.0));
    }
}
