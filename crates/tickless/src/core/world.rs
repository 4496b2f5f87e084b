//! The world: grid, entities and the virtual clock they share.
//!
//! Entities and tiles never hold a reference back to the world. Every hook
//! gets an explicit context borrowing just the parts it may touch, and
//! timers name their target by [`EntityId`] so a despawned entity simply
//! stops receiving them.

use std::fmt;

use glam::DVec2;

use crate::api::config::WorldConfig;
use crate::api::error::{EngineError, Result};
use crate::api::types::{Axis, CellHit, EntityId, Icon};
use crate::assets::tileset::Tileset;
use crate::components::entity::{Entity, EntityCtx, EntityState};
use crate::components::tile::TileCtx;
use crate::core::grid::{Cell, CellRef, Grid};
use crate::core::scene::Scene;
use crate::core::scheduler::{Scheduler, TimerHandle};
use crate::core::time::Clock;
use crate::renderer::traits::Renderer;
use crate::systems::debug::debug_draw_segments;
use crate::systems::render::render_world;

/// Payload of every timer the world schedules.
pub enum WorldEvent {
    /// Re-run the collision prediction of an entity.
    Predict(EntityId),
    /// The grid changed; every entity re-asserts its motion.
    MapChanged,
    /// Host callback registered through [`World::after`].
    Deferred(Box<dyn FnOnce(&mut World)>),
}

impl fmt::Debug for WorldEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldEvent::Predict(id) => f.debug_tuple("Predict").field(id).finish(),
            WorldEvent::MapChanged => f.write_str("MapChanged"),
            WorldEvent::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

#[derive(Debug)]
pub struct World {
    grid: Grid,
    scheduler: Scheduler<WorldEvent>,
    scene: Scene,
    next_id: u32,
}

impl World {
    pub fn new(mut grid: Grid, clock: impl Clock + 'static) -> Self {
        // A clean cache lets the first edit queue a map-changed broadcast.
        grid.ensure_cache();
        Self {
            grid,
            scheduler: Scheduler::new(clock),
            scene: Scene::new(),
            next_id: 1,
        }
    }

    /// A world with an empty grid described by `config`.
    pub fn from_config(config: &WorldConfig, clock: impl Clock + 'static) -> Result<Self> {
        Ok(Self::new(Grid::from_config(config)?, clock))
    }

    /// A world over already-parsed map rows (`rows[y][x]`).
    pub fn from_rows(
        rows: &[Vec<Icon>],
        tileset: Tileset,
        solid: impl IntoIterator<Item = Icon>,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        Ok(Self::new(Grid::from_rows(rows, tileset, solid)?, clock))
    }

    /// Current virtual time.
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn scheduler(&self) -> &Scheduler<WorldEvent> {
        &self.scheduler
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    // -- Entities --

    /// Add an entity and run its attach broadcast. Returns its new id.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.state = EntityState {
            id: Some(id),
            ..EntityState::default()
        };
        self.scene.spawn(entity);
        self.with_entity(id, |ctx| ctx.attach());
        log::info!("spawned {:?} at t={}", id, self.now());
        id
    }

    /// Remove an entity, cancelling its pending prediction.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let mut entity = self.scene.despawn(id)?;
        if let Some(handle) = entity.state.collision_timer.take() {
            self.scheduler.cancel(handle);
        }
        entity.state.id = None;
        log::info!("despawned {:?} at t={}", id, self.now());
        Some(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.scene.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.scene.iter()
    }

    /// Position of an entity at the current virtual time.
    pub fn position(&self, id: EntityId) -> Option<DVec2> {
        self.entity(id)?.view().position(self.now())
    }

    pub fn velocity(&self, id: EntityId) -> Option<DVec2> {
        Some(self.entity(id)?.view().velocity())
    }

    pub fn size(&self, id: EntityId) -> Option<DVec2> {
        Some(self.entity(id)?.view().size())
    }

    /// Change an entity's velocity. Returns whether a component took it.
    pub fn set_velocity(&mut self, id: EntityId, velocity: DVec2) -> bool {
        self.with_entity(id, |ctx| ctx.set_velocity(velocity))
            .is_some_and(|d| d.is_handled())
    }

    /// Deliver a movement intent. Returns whether a component took it.
    pub fn control_move(&mut self, id: EntityId, direction: DVec2) -> bool {
        self.with_entity(id, |ctx| ctx.control_move(direction))
            .is_some_and(|d| d.is_handled())
    }

    /// Scheduled time of the entity's pending collision prediction, if any.
    pub fn collision_due(&self, id: EntityId) -> Option<f64> {
        let handle = self.entity(id)?.state().collision_timer?;
        self.scheduler.due_time(handle)
    }

    fn with_entity<R>(&mut self, id: EntityId, f: impl FnOnce(&mut EntityCtx<'_>) -> R) -> Option<R> {
        let entity = self.scene.get_mut(id)?;
        let mut ctx = entity.ctx(&mut self.grid, &mut self.scheduler);
        Some(f(&mut ctx))
    }

    // -- Grid --

    pub fn get(&self, x: u32, y: u32) -> Option<CellRef<'_>> {
        self.grid.get(x, y)
    }

    /// Replace a cell. Any tile already there is detached first; a new tile
    /// must publish an icon from its attach hook.
    pub fn set(&mut self, x: u32, y: u32, cell: impl Into<Cell>) -> Result<()> {
        self.grid.check_bounds(x, y)?;
        let cell = cell.into();
        if let Cell::Icon(icon) = cell {
            self.grid.tileset().check_icon(icon)?;
        }

        if let Some(mut old) = self.grid.take_tile(x, y) {
            old.detach(&mut self.tile_ctx(x, y));
        }

        match cell {
            Cell::Icon(icon) => self.grid.write_icon(x, y, Some(icon)),
            Cell::Tile(mut tile) => {
                self.grid.write_icon(x, y, None);
                tile.attach(&mut self.tile_ctx(x, y));
                let published = self
                    .grid
                    .icon(x, y)
                    .ok_or(EngineError::TileWithoutIcon { x, y })
                    .and_then(|icon| self.grid.tileset().check_icon(icon));
                if let Err(err) = published {
                    tile.detach(&mut self.tile_ctx(x, y));
                    let fallback = self.grid.default_icon();
                    self.grid.write_icon(x, y, Some(fallback));
                    self.grid.invalidate(&mut self.scheduler);
                    return Err(err);
                }
                self.grid.insert_tile(x, y, tile);
            }
        }
        self.grid.invalidate(&mut self.scheduler);
        Ok(())
    }

    /// Change what a cell renders as without detaching its tile.
    pub fn set_icon(&mut self, x: u32, y: u32, icon: Icon) -> Result<()> {
        self.grid.check_bounds(x, y)?;
        self.grid.tileset().check_icon(icon)?;
        self.tile_ctx(x, y).set_icon(icon);
        Ok(())
    }

    pub fn is_solid(&self, x: i64, y: i64) -> bool {
        self.grid.is_solid(x, y)
    }

    pub fn unmap(&self, px: f64, py: f64) -> Option<CellHit> {
        self.grid.unmap(px, py)
    }

    pub fn ray_cast(&mut self, origin: DVec2, direction: DVec2, axis: Axis, fudge: f64) -> f64 {
        self.grid.ray_cast(origin, direction, axis, fudge)
    }

    /// Deliver an interaction to the tile at a cell. Returns whether the
    /// tile handled it; plain icon cells never do.
    pub fn interact(&mut self, x: u32, y: u32, local: DVec2) -> bool {
        let Some(mut tile) = self.grid.take_tile(x, y) else {
            return false;
        };
        let handled = tile.interact(&mut self.tile_ctx(x, y), local);
        self.grid.insert_tile(x, y, tile);
        handled.is_handled()
    }

    /// Interact with whatever tile lies under a grid-relative pixel.
    pub fn interact_at(&mut self, px: f64, py: f64) -> bool {
        match self.unmap(px, py) {
            Some(hit) => self.interact(hit.x, hit.y, DVec2::new(hit.local_x, hit.local_y)),
            None => false,
        }
    }

    fn tile_ctx(&mut self, x: u32, y: u32) -> TileCtx<'_> {
        TileCtx {
            x,
            y,
            grid: &mut self.grid,
            scheduler: &mut self.scheduler,
        }
    }

    // -- Time --

    /// Run `f` with the world `delay` seconds of virtual time from now.
    pub fn after(&mut self, delay: f64, f: impl FnOnce(&mut World) + 'static) -> TimerHandle {
        self.scheduler.add_timer(delay, WorldEvent::Deferred(Box::new(f)))
    }

    /// Run `f` at absolute virtual time `time`. A time already in the past
    /// fires on the next pump without rewinding the clock.
    pub fn after_at(&mut self, time: f64, f: impl FnOnce(&mut World) + 'static) -> TimerHandle {
        self.scheduler.add_timer_at(time, WorldEvent::Deferred(Box::new(f)))
    }

    /// Run `f` on the next pump, after anything already due.
    pub fn on_next(&mut self, f: impl FnOnce(&mut World) + 'static) -> TimerHandle {
        self.scheduler.on_next(WorldEvent::Deferred(Box::new(f)))
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Fire every timer due by the clock's current reading, then advance
    /// virtual time to it. Returns how many timers fired.
    pub fn pump(&mut self) -> usize {
        let deadline = self.scheduler.begin_pump();
        let mut fired = 0;
        while let Some(event) = self.scheduler.pop_due(deadline) {
            self.handle(event);
            fired += 1;
        }
        self.scheduler.finish_pump(deadline);
        fired
    }

    fn handle(&mut self, event: WorldEvent) {
        match event {
            WorldEvent::Predict(id) => {
                if self.with_entity(id, |ctx| ctx.kinematic_update()).is_none() {
                    log::warn!("prediction fired for despawned {:?}", id);
                }
            }
            WorldEvent::MapChanged => {
                // Rebuild now so the next edit queues a fresh broadcast.
                self.grid.ensure_cache();
                let ids: Vec<EntityId> = self.scene.ids().collect();
                log::debug!("map changed at t={}, notifying {} entities", self.now(), ids.len());
                for id in ids {
                    self.with_entity(id, |ctx| ctx.map_changed());
                }
            }
            WorldEvent::Deferred(f) => f(self),
        }
    }

    // -- Presentation --

    /// Draw every cell, then every entity at the current time.
    pub fn render(&self, renderer: &mut dyn Renderer, offset: DVec2) {
        render_world(&self.grid, &self.scene, self.now(), renderer, offset);
    }

    /// Draw the cached wall segments, rebuilding them first if stale.
    pub fn debug_draw(&mut self, renderer: &mut dyn Renderer, offset: DVec2) {
        debug_draw_segments(&mut self.grid, renderer, offset);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::components::collider::GridCollider;
    use crate::components::kinematics::{Controllable, PositionStatic, PositionVelocity};
    use crate::components::sprite::RenderImage;
    use crate::components::tile::{Door, SimpleIcon, Tile, TileBehavior};
    use crate::core::time::ManualClock;

    const FLOOR: Icon = Icon::new(1, 0);
    const WALL: Icon = Icon::new(0, 0);
    const DOOR_CLOSED: Icon = Icon::new(2, 0);
    const DOOR_OPEN: Icon = Icon::new(3, 0);

    fn world(width: u32, height: u32) -> (World, ManualClock) {
        let clock = ManualClock::new(0.0);
        let tileset = Tileset::new(4, 4, 1, 1).unwrap();
        let grid = Grid::new(width, height, tileset, FLOOR, [WALL, DOOR_CLOSED]).unwrap();
        (World::new(grid, clock.clone()), clock)
    }

    fn mover(pos: DVec2, velocity: DVec2) -> Entity {
        Entity::new(vec![
            Box::new(RenderImage::new(Default::default(), DVec2::splat(0.5))),
            Box::new(PositionVelocity::new(pos, velocity)),
            Box::new(GridCollider::new()),
        ])
        .unwrap()
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut w, _clock) = world(4, 4);
        let a = w.spawn(Entity::new(vec![Box::new(PositionStatic::new(DVec2::ZERO))]).unwrap());
        w.despawn(a).unwrap();
        let b = w.spawn(Entity::new(vec![Box::new(PositionStatic::new(DVec2::ZERO))]).unwrap());
        assert_ne!(a, b);
        assert!(w.entity(a).is_none());
    }

    #[test]
    fn spawn_installs_basis_at_current_time() {
        let (mut w, clock) = world(20, 3);
        clock.set(2.0);
        w.pump();
        let id = w.spawn(mover(DVec2::new(1.0, 1.5), DVec2::new(1.0, 0.0)));
        assert_eq!(w.position(id), Some(DVec2::new(1.0, 1.5)));
        clock.set(3.0);
        w.pump();
        assert_eq!(w.position(id), Some(DVec2::new(2.0, 1.5)));
    }

    #[test]
    fn mover_stops_at_the_wall() {
        let (mut w, clock) = world(8, 1);
        w.set(6, 0, WALL).unwrap();
        w.pump();
        let id = w.spawn(mover(DVec2::new(1.0, 0.5), DVec2::new(1.0, 0.0)));
        // Right edge starts at 1.25 and meets the wall's face at 6.0.
        let due = w.collision_due(id).unwrap();
        assert!((due - 4.75).abs() < 1e-9, "due at {}", due);

        clock.set(10.0);
        w.pump();
        assert_eq!(w.velocity(id), Some(DVec2::ZERO));
        let pos = w.position(id).unwrap();
        assert!((pos.x - 5.75).abs() < 1e-6, "stopped at {}", pos);
        assert_eq!(w.collision_due(id), None);
    }

    #[test]
    fn at_most_one_prediction_per_entity() {
        let (mut w, _clock) = world(8, 8);
        w.set(7, 3, WALL).unwrap();
        w.pump();
        let id = w.spawn(mover(DVec2::new(1.0, 3.5), DVec2::new(1.0, 0.0)));
        assert_eq!(w.pending_timers(), 1);
        for _ in 0..5 {
            w.set_velocity(id, DVec2::new(2.0, 0.0));
            assert_eq!(w.pending_timers(), 1);
        }
        w.set_velocity(id, DVec2::ZERO);
        assert_eq!(w.pending_timers(), 0);
    }

    #[test]
    fn despawn_cancels_prediction() {
        let (mut w, clock) = world(8, 1);
        w.set(7, 0, WALL).unwrap();
        w.pump();
        let id = w.spawn(mover(DVec2::new(1.0, 0.5), DVec2::new(1.0, 0.0)));
        assert_eq!(w.pending_timers(), 1);
        assert!(w.despawn(id).is_some());
        assert_eq!(w.pending_timers(), 0);
        clock.set(100.0);
        assert_eq!(w.pump(), 0);
    }

    #[test]
    fn control_move_scales_to_speed() {
        let (mut w, _clock) = world(4, 4);
        let id = w.spawn(
            Entity::new(vec![
                Box::new(PositionVelocity::new(DVec2::splat(2.0), DVec2::ZERO)),
                Box::new(Controllable::new(64.0)),
            ])
            .unwrap(),
        );
        assert!(w.control_move(id, DVec2::new(3.0, 4.0)));
        let v = w.velocity(id).unwrap();
        assert!((v - DVec2::new(38.4, 51.2)).length() < 1e-9);
        assert!(w.control_move(id, DVec2::ZERO));
        assert_eq!(w.velocity(id), Some(DVec2::ZERO));
    }

    #[test]
    fn static_entity_ignores_velocity() {
        let (mut w, _clock) = world(4, 4);
        let id = w.spawn(Entity::new(vec![Box::new(PositionStatic::new(DVec2::ONE))]).unwrap());
        assert!(!w.set_velocity(id, DVec2::X));
        assert_eq!(w.velocity(id), Some(DVec2::ZERO));
        assert!(!w.set_velocity(EntityId(99), DVec2::X));
    }

    #[test]
    fn set_rejects_bad_input() {
        let (mut w, _clock) = world(4, 4);
        assert!(matches!(w.set(4, 0, WALL), Err(EngineError::OutOfBounds { x: 4, y: 0 })));
        assert!(matches!(w.set(0, 0, Icon::new(7, 0)), Err(EngineError::IconOutOfTileset(_))));
    }

    #[test]
    fn tile_without_icon_is_rejected() {
        let (mut w, _clock) = world(4, 4);
        let err = w.set(1, 1, Tile::default()).unwrap_err();
        assert!(matches!(err, EngineError::TileWithoutIcon { x: 1, y: 1 }));
        assert!(w.grid().tile(1, 1).is_none());
        assert_eq!(w.grid().icon(1, 1), Some(FLOOR));
    }

    #[test]
    fn tile_overlay_takes_precedence() {
        let (mut w, _clock) = world(4, 4);
        w.set(2, 2, Tile::default().with(SimpleIcon(WALL))).unwrap();
        assert!(matches!(w.get(2, 2), Some(CellRef::Tile(_))));
        assert!(w.is_solid(2, 2));
        w.set(2, 2, FLOOR).unwrap();
        assert!(matches!(w.get(2, 2), Some(CellRef::Icon(FLOOR))));
        assert!(!w.is_solid(2, 2));
    }

    #[derive(Debug)]
    struct Recorder(Rc<RefCell<Vec<&'static str>>>);

    impl TileBehavior for Recorder {
        fn on_add(&mut self, ctx: &mut TileCtx<'_>) {
            self.0.borrow_mut().push("add");
            ctx.set_icon(FLOOR);
        }

        fn on_remove(&mut self, _ctx: &mut TileCtx<'_>) {
            self.0.borrow_mut().push("remove");
        }
    }

    /// Records its hooks but never publishes an icon.
    #[derive(Debug)]
    struct Silent(Rc<RefCell<Vec<&'static str>>>);

    impl TileBehavior for Silent {
        fn on_add(&mut self, _ctx: &mut TileCtx<'_>) {
            self.0.borrow_mut().push("add");
        }

        fn on_remove(&mut self, _ctx: &mut TileCtx<'_>) {
            self.0.borrow_mut().push("remove");
        }
    }

    #[test]
    fn rejected_tile_is_detached() {
        let (mut w, _clock) = world(4, 4);
        let log = Rc::new(RefCell::new(Vec::new()));
        let err = w.set(2, 1, Tile::default().with(Silent(log.clone()))).unwrap_err();
        assert!(matches!(err, EngineError::TileWithoutIcon { x: 2, y: 1 }));
        assert_eq!(*log.borrow(), vec!["add", "remove"]);
        assert!(w.grid().tile(2, 1).is_none());
        assert_eq!(w.grid().icon(2, 1), Some(FLOOR));
    }

    #[test]
    fn replacing_a_tile_runs_its_remove_hook() {
        let (mut w, _clock) = world(4, 4);
        let log = Rc::new(RefCell::new(Vec::new()));
        w.set(0, 0, Tile::default().with(Recorder(log.clone()))).unwrap();
        w.set(0, 0, WALL).unwrap();
        assert_eq!(*log.borrow(), vec!["add", "remove"]);
        assert!(w.grid().tile(0, 0).is_none());
    }

    #[test]
    fn door_toggles_solidity() {
        let (mut w, _clock) = world(4, 4);
        w.set(1, 0, Tile::default().with(Door::new(DOOR_OPEN, DOOR_CLOSED))).unwrap();
        assert!(w.is_solid(1, 0));
        assert!(w.interact(1, 0, DVec2::ZERO));
        assert!(!w.is_solid(1, 0));
        assert_eq!(w.grid().icon(1, 0), Some(DOOR_OPEN));
        assert!(w.interact_at(1.5, 0.5));
        assert!(w.is_solid(1, 0));
        assert!(!w.interact(2, 2, DVec2::ZERO));
        assert!(!w.interact_at(-3.0, 0.0));
    }

    #[test]
    fn set_icon_keeps_the_tile() {
        let (mut w, _clock) = world(4, 4);
        w.set(3, 3, Tile::default().with(SimpleIcon(FLOOR))).unwrap();
        w.set_icon(3, 3, WALL).unwrap();
        assert!(w.grid().tile(3, 3).is_some());
        assert!(w.is_solid(3, 3));
    }

    #[test]
    fn edits_coalesce_into_one_broadcast() {
        let (mut w, _clock) = world(4, 4);
        w.pump();
        w.set(0, 0, WALL).unwrap();
        w.set(1, 0, WALL).unwrap();
        w.set_icon(2, 0, WALL).unwrap();
        assert_eq!(w.pending_timers(), 1);
        assert_eq!(w.pump(), 1);
        assert!(!w.grid().is_cache_dirty());
        w.set(3, 0, WALL).unwrap();
        assert_eq!(w.pending_timers(), 1);
    }

    #[test]
    fn deferred_callbacks_run_on_virtual_time() {
        let (mut w, clock) = world(4, 4);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        w.after(2.0, move |w| s.borrow_mut().push(w.now()));
        let s = seen.clone();
        let h = w.after(1.0, move |w| s.borrow_mut().push(-w.now()));
        assert!(w.cancel(h));
        clock.set(5.0);
        w.pump();
        assert_eq!(*seen.borrow(), vec![2.0]);
        assert_eq!(w.now(), 5.0);
    }

    #[test]
    fn absolute_and_next_turn_callbacks() {
        let (mut w, clock) = world(4, 4);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        w.after_at(3.0, move |w| s.borrow_mut().push(("at", w.now())));
        let s = seen.clone();
        w.after(0.0, move |w| s.borrow_mut().push(("after", w.now())));
        let s = seen.clone();
        w.on_next(move |w| s.borrow_mut().push(("next", w.now())));

        assert_eq!(w.pump(), 2);
        assert_eq!(*seen.borrow(), vec![("after", 0.0), ("next", 0.0)]);

        clock.set(4.0);
        assert_eq!(w.pump(), 1);
        assert_eq!(seen.borrow()[2], ("at", 3.0));

        let s = seen.clone();
        let h = w.after_at(10.0, move |_| s.borrow_mut().push(("cancelled", 0.0)));
        assert!(w.cancel(h));
        clock.set(20.0);
        assert_eq!(w.pump(), 0);
        assert_eq!(seen.borrow().len(), 3);
    }
}
