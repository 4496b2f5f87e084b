use glam::DVec2;

use crate::core::grid::Grid;
use crate::core::scene::Scene;
use crate::renderer::traits::{Rect, Renderer};

/// Draw every grid cell as its icon.
pub fn render_grid(grid: &Grid, renderer: &mut dyn Renderer, offset: DVec2) {
    let cell = grid.cell_size();
    for (x, y, icon) in grid.icons() {
        let min = offset + DVec2::new(x as f64, y as f64) * cell;
        renderer.draw_icon(icon, Rect::new(min, cell));
    }
}

/// Draw the grid, then every entity evaluated at `now`, in spawn order.
pub fn render_world(grid: &Grid, scene: &Scene, now: f64, renderer: &mut dyn Renderer, offset: DVec2) {
    render_grid(grid, renderer, offset);
    for entity in scene.iter() {
        entity.view().render(renderer, offset, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Icon;
    use crate::assets::tileset::Tileset;
    use crate::components::entity::Entity;
    use crate::components::kinematics::PositionVelocity;
    use crate::components::sprite::{AtlasId, RenderImage, SpriteComponent};
    use crate::core::time::ManualClock;
    use crate::core::world::World;
    use crate::renderer::instance::RenderBuffer;

    #[test]
    fn grid_cells_are_laid_out_by_cell_size() {
        let grid = Grid::new(3, 2, Tileset::default(), Icon::new(1, 0), [Icon::new(0, 0)]).unwrap();
        let mut buffer = RenderBuffer::new();
        render_grid(&grid, &mut buffer, DVec2::new(5.0, 7.0));
        assert_eq!(buffer.tile_split(), 6);
        let last = buffer.tiles()[5];
        assert_eq!((last.x, last.y, last.width, last.height), (69.0, 39.0, 32.0, 32.0));
        assert_eq!((last.col, last.row), (1.0, 0.0));
    }

    #[test]
    fn entities_render_at_current_time() {
        let clock = ManualClock::new(0.0);
        let grid = Grid::new(10, 10, Tileset::default(), Icon::new(1, 0), [Icon::new(0, 0)]).unwrap();
        let mut world = World::new(grid, clock.clone());
        world.spawn(
            Entity::new(vec![
                Box::new(RenderImage::new(SpriteComponent::new(AtlasId(1), 2.0, 3.0), DVec2::splat(16.0))),
                Box::new(PositionVelocity::new(DVec2::new(48.0, 48.0), DVec2::new(10.0, 0.0))),
            ])
            .unwrap(),
        );
        clock.set(2.0);
        world.pump();

        let mut buffer = RenderBuffer::new();
        world.render(&mut buffer, DVec2::ZERO);
        assert_eq!(buffer.instance_count(), 101);
        let sprite = buffer.sprites()[0];
        // Centre (68, 48), size 16.
        assert_eq!((sprite.x, sprite.y), (60.0, 40.0));
        assert_eq!((sprite.atlas, sprite.col, sprite.row), (1.0, 2.0, 3.0));
    }
}
