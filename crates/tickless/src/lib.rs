//! Tickless grid-world simulation kernel.
//!
//! Nothing here advances on a frame tick. Entities move along analytic
//! bases, collisions are predicted by ray casts against a cached set of wall
//! segments, and a virtual-clock scheduler fires each predicted impact at
//! its exact time. The host only calls [`World::pump`] as often as it likes.

pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod assets;

// Re-export key types at crate root for convenience
pub use api::config::WorldConfig;
pub use api::error::{EngineError, Result};
pub use api::types::{Axes, Axis, CellHit, EntityId, Icon};
pub use assets::tileset::Tileset;
pub use components::collider::{predict_impact, GridCollider, Impact};
pub use components::entity::{Component, Dispatch, Entity, EntityCtx, EntityState, EntityView, MessageKind};
pub use components::kinematics::{Basis, Controllable, PositionStatic, PositionVelocity};
pub use components::sprite::{AtlasId, RenderImage, SpriteComponent};
pub use components::tile::{Door, SimpleIcon, Tile, TileBehavior, TileCtx};
pub use core::grid::{Cell, CellRef, Grid, DEFAULT_FUDGE_FACTOR};
pub use core::scene::Scene;
pub use core::scheduler::{Scheduler, TimerHandle};
pub use core::segments::{Direction, Segment, SegmentCache};
pub use core::time::{Clock, ManualClock, MonotonicClock};
pub use core::world::{World, WorldEvent};
pub use renderer::instance::{DebugLine, RenderBuffer, RenderInstance};
pub use renderer::traits::{Rect, Renderer};
pub use systems::debug::debug_draw_segments;
pub use systems::render::{render_grid, render_world};
