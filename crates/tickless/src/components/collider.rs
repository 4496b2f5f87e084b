//! Predictive wall collisions.
//!
//! Instead of testing for overlap every frame, the collider casts rays from
//! the entity's bounding-box corners along its velocity, finds the nearest
//! wall, and arms one timer for the instant of impact. When that timer fires
//! the prediction runs again, now finds the wall flush against the box, and
//! delivers the collision.

use glam::DVec2;

use crate::api::types::{Axes, Axis};
use crate::components::entity::{Component, Dispatch, EntityCtx, MessageKind};
use crate::core::grid::Grid;
use crate::core::world::WorldEvent;

/// Outcome of one prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    /// Travel distance to the nearest wall (infinite if none).
    pub distance: f64,
    /// Seconds until impact at the current speed.
    pub time: f64,
    /// Axes of the rays that produced the nearest hit.
    pub axes: Axes,
    /// Axes already in contact (hit within the fudge factor).
    pub contact: Axes,
}

impl Impact {
    pub fn is_immediate(&self) -> bool {
        self.contact.any()
    }
}

/// Cast the eight corner rays of a `size` box centred at `pos` moving at
/// `velocity`. Returns `None` for a stationary box.
///
/// The box must be smaller than the walls it can meet; a larger box can slip
/// past a wall narrower than itself.
pub fn predict_impact(
    grid: &mut Grid,
    pos: DVec2,
    size: DVec2,
    velocity: DVec2,
    fudge: f64,
) -> Option<Impact> {
    let speed = velocity.length();
    if speed == 0.0 {
        return None;
    }
    let direction = velocity / speed;
    let half = size / 2.0;
    let corners = [
        pos + DVec2::new(-half.x, -half.y),
        pos + DVec2::new(half.x, -half.y),
        pos + DVec2::new(-half.x, half.y),
        pos + DVec2::new(half.x, half.y),
    ];

    let mut hits = [(f64::INFINITY, Axis::Horizontal); 8];
    let mut distance = f64::INFINITY;
    let mut contact = Axes::NONE;
    for (i, corner) in corners.into_iter().enumerate() {
        for (j, axis) in [Axis::Horizontal, Axis::Vertical].into_iter().enumerate() {
            let d = grid.ray_cast(corner, direction, axis, fudge);
            if d <= fudge {
                contact.set(axis);
            }
            distance = distance.min(d);
            hits[i * 2 + j] = (d, axis);
        }
    }

    let mut axes = Axes::NONE;
    if distance.is_finite() {
        for (d, axis) in hits {
            if d <= distance + fudge {
                axes.set(axis);
            }
        }
    }

    Some(Impact {
        distance,
        time: distance / speed,
        axes,
        contact,
    })
}

/// Keeps exactly one collision-prediction timer armed for its entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridCollider;

impl GridCollider {
    pub fn new() -> Self {
        Self
    }

    fn predict(&self, ctx: &mut EntityCtx<'_>) {
        if let Some(previous) = ctx.state.collision_timer.take() {
            ctx.scheduler.cancel(previous);
        }
        let now = ctx.now();
        let Some(pos) = ctx.position(now) else {
            return;
        };
        let size = ctx.size();
        let velocity = ctx.velocity();
        let fudge = ctx.grid.fudge_factor();
        let Some(impact) = predict_impact(ctx.grid, pos, size, velocity, fudge) else {
            return;
        };
        log::trace!(
            "predict {:?}: pos={} size={} vel={} distance={} contact={:?}",
            ctx.id(),
            pos,
            size,
            velocity,
            impact.distance,
            impact.contact,
        );

        if impact.is_immediate() {
            ctx.collide(impact.contact);
            return;
        }
        let Some(id) = ctx.id() else {
            return;
        };
        let handle = ctx.scheduler.add_timer(impact.time, WorldEvent::Predict(id));
        if !handle.is_never() {
            ctx.state.collision_timer = Some(handle);
        }
    }
}

impl Component for GridCollider {
    fn handles(&self) -> &'static [MessageKind] {
        &[MessageKind::Attach, MessageKind::KinematicUpdate]
    }

    fn on_add(&self, ctx: &mut EntityCtx<'_>) -> Dispatch {
        ctx.state.collision_timer = None;
        self.predict(ctx);
        Dispatch::NotHandled
    }

    fn on_kinematic_update(&self, ctx: &mut EntityCtx<'_>) -> Dispatch {
        self.predict(ctx);
        Dispatch::NotHandled
    }
}
