//! Stateful tiles: grid cells with behaviour.
//!
//! A tile owns its cell's icon. It must publish one from its attach hook
//! (the grid rejects it otherwise) and may swap it later, which is how a
//! door turns solid or passable.

use std::fmt;

use glam::DVec2;

use crate::api::types::Icon;
use crate::components::entity::Dispatch;
use crate::core::grid::Grid;
use crate::core::scheduler::Scheduler;
use crate::core::world::WorldEvent;

/// Behaviour attached to a tile. All hooks are optional.
pub trait TileBehavior: fmt::Debug {
    /// The tile was placed on the grid.
    fn on_add(&mut self, _ctx: &mut TileCtx<'_>) {}

    /// The tile is being replaced or cleared.
    fn on_remove(&mut self, _ctx: &mut TileCtx<'_>) {}

    /// Something interacted with the tile (e.g. a click), at `local` pixels
    /// inside the cell.
    fn on_interact(&mut self, _ctx: &mut TileCtx<'_>, _local: DVec2) -> Dispatch {
        Dispatch::NotHandled
    }
}

/// Access a tile hook gets to the world around its cell.
pub struct TileCtx<'a> {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) grid: &'a mut Grid,
    pub(crate) scheduler: &'a mut Scheduler<WorldEvent>,
}

impl TileCtx<'_> {
    /// Cell coordinates of the tile.
    pub fn cell(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn icon(&self) -> Option<Icon> {
        self.grid.icon(self.x, self.y)
    }

    /// Change what the cell renders as (and therefore whether it is solid)
    /// without detaching the tile.
    pub fn set_icon(&mut self, icon: Icon) {
        if self.grid.icon(self.x, self.y) == Some(icon) {
            return;
        }
        self.grid.write_icon(self.x, self.y, Some(icon));
        self.grid.invalidate(self.scheduler);
    }

    pub fn is_solid(&self) -> bool {
        self.grid.is_solid(self.x as i64, self.y as i64)
    }
}

/// A grid cell with behaviour, built from an ordered list of behaviours.
#[derive(Debug, Default)]
pub struct Tile {
    behaviors: Vec<Box<dyn TileBehavior>>,
}

impl Tile {
    pub fn new(behaviors: Vec<Box<dyn TileBehavior>>) -> Self {
        Self { behaviors }
    }

    pub fn with(mut self, behavior: impl TileBehavior + 'static) -> Self {
        self.behaviors.push(Box::new(behavior));
        self
    }

    pub(crate) fn attach(&mut self, ctx: &mut TileCtx<'_>) {
        for behavior in &mut self.behaviors {
            behavior.on_add(ctx);
        }
    }

    pub(crate) fn detach(&mut self, ctx: &mut TileCtx<'_>) {
        for behavior in &mut self.behaviors {
            behavior.on_remove(ctx);
        }
    }

    /// First behaviour to handle the interaction wins.
    pub(crate) fn interact(&mut self, ctx: &mut TileCtx<'_>, local: DVec2) -> Dispatch {
        for behavior in &mut self.behaviors {
            if behavior.on_interact(ctx, local).is_handled() {
                return Dispatch::Handled;
            }
        }
        Dispatch::NotHandled
    }
}

/// Publishes a fixed icon when attached.
#[derive(Debug, Clone, Copy)]
pub struct SimpleIcon(pub Icon);

impl TileBehavior for SimpleIcon {
    fn on_add(&mut self, ctx: &mut TileCtx<'_>) {
        ctx.set_icon(self.0);
    }
}

/// A door that toggles between an open and a closed icon on interaction.
/// Whether it blocks movement is up to the solid-icon set.
#[derive(Debug, Clone, Copy)]
pub struct Door {
    open_icon: Icon,
    closed_icon: Icon,
    open: bool,
}

impl Door {
    /// A closed door.
    pub fn new(open_icon: Icon, closed_icon: Icon) -> Self {
        Self {
            open_icon,
            closed_icon,
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn current_icon(&self) -> Icon {
        if self.open {
            self.open_icon
        } else {
            self.closed_icon
        }
    }
}

impl TileBehavior for Door {
    fn on_add(&mut self, ctx: &mut TileCtx<'_>) {
        self.open = false;
        ctx.set_icon(self.current_icon());
    }

    fn on_interact(&mut self, ctx: &mut TileCtx<'_>, _local: DVec2) -> Dispatch {
        self.open = !self.open;
        log::debug!("door at {:?} {}", ctx.cell(), if self.open { "opened" } else { "closed" });
        ctx.set_icon(self.current_icon());
        Dispatch::Handled
    }
}
