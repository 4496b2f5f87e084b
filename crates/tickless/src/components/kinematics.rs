//! Analytic motion.
//!
//! A moving entity's position is never integrated. It is evaluated from a
//! [`Basis`] `(origin, velocity, time)` whenever someone asks, and the basis
//! is only ever replaced whole, at the instant the velocity changes.

use glam::DVec2;

use crate::api::types::Axes;
use crate::components::entity::{Component, Dispatch, EntityCtx, EntityState, MessageKind};

/// Position/velocity snapshot: `position(t) = origin + velocity * (t - time)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub origin: DVec2,
    pub velocity: DVec2,
    pub time: f64,
}

impl Basis {
    pub fn new(origin: DVec2, velocity: DVec2, time: f64) -> Self {
        Self { origin, velocity, time }
    }

    pub fn position_at(&self, now: f64) -> DVec2 {
        self.origin + self.velocity * (now - self.time)
    }

    /// New basis starting where this one is at `now`, moving at `velocity`.
    pub fn rebased(&self, now: f64, velocity: DVec2) -> Self {
        Self {
            origin: self.position_at(now),
            velocity,
            time: now,
        }
    }
}

/// Fixed position, zero velocity.
#[derive(Debug, Clone, Copy)]
pub struct PositionStatic {
    pos: DVec2,
}

impl PositionStatic {
    pub fn new(pos: DVec2) -> Self {
        Self { pos }
    }
}

impl Component for PositionStatic {
    fn handles(&self) -> &'static [MessageKind] {
        &[MessageKind::Position, MessageKind::Velocity]
    }

    fn position(&self, _state: &EntityState, _now: f64) -> Option<DVec2> {
        Some(self.pos)
    }

    fn velocity(&self, _state: &EntityState) -> Option<DVec2> {
        Some(DVec2::ZERO)
    }
}

/// Constant-velocity motion between kinematic updates.
///
/// Owns the entity's [`Basis`]: installs it on attach, replaces it on every
/// velocity change and broadcasts a kinematic update afterwards. Velocity is
/// frozen between two such broadcasts.
#[derive(Debug, Clone, Copy)]
pub struct PositionVelocity {
    initial: Basis,
}

impl PositionVelocity {
    pub fn new(pos: DVec2, velocity: DVec2) -> Self {
        Self {
            initial: Basis::new(pos, velocity, 0.0),
        }
    }

    fn basis(&self, state: &EntityState) -> Basis {
        state.basis.unwrap_or(self.initial)
    }
}

impl Component for PositionVelocity {
    fn handles(&self) -> &'static [MessageKind] {
        &[
            MessageKind::Attach,
            MessageKind::Position,
            MessageKind::Velocity,
            MessageKind::SetVelocity,
            MessageKind::Collide,
            MessageKind::MapChanged,
        ]
    }

    fn on_add(&self, ctx: &mut EntityCtx<'_>) -> Dispatch {
        let now = ctx.now();
        ctx.state.basis = Some(Basis::new(self.initial.origin, self.initial.velocity, now));
        Dispatch::NotHandled
    }

    fn position(&self, state: &EntityState, now: f64) -> Option<DVec2> {
        match state.basis {
            Some(basis) => Some(basis.position_at(now)),
            // Detached: the clock hasn't started for this entity yet.
            None => Some(self.initial.origin),
        }
    }

    fn velocity(&self, state: &EntityState) -> Option<DVec2> {
        Some(self.basis(state).velocity)
    }

    fn set_velocity(&self, ctx: &mut EntityCtx<'_>, velocity: DVec2) -> Dispatch {
        let now = ctx.now();
        let basis = match ctx.state.basis {
            Some(basis) => basis.rebased(now, velocity),
            None => Basis::new(self.initial.origin, velocity, now),
        };
        ctx.state.basis = Some(basis);
        ctx.kinematic_update();
        Dispatch::Handled
    }

    fn on_collide(&self, ctx: &mut EntityCtx<'_>, axes: Axes) -> Dispatch {
        let mut velocity = self.basis(ctx.state).velocity;
        if axes.horizontal {
            velocity.x = 0.0;
        }
        if axes.vertical {
            velocity.y = 0.0;
        }
        ctx.set_velocity(velocity);
        Dispatch::NotHandled
    }

    fn on_map_changed(&self, ctx: &mut EntityCtx<'_>) -> Dispatch {
        // Same motion, fresh prediction: a new wall may now be in the way.
        let velocity = self.basis(ctx.state).velocity;
        ctx.set_velocity(velocity);
        Dispatch::NotHandled
    }
}

/// Turns a movement intent into a velocity at a fixed speed.
#[derive(Debug, Clone, Copy)]
pub struct Controllable {
    speed: f64,
}

impl Controllable {
    pub fn new(speed: f64) -> Self {
        Self { speed }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl Component for Controllable {
    fn handles(&self) -> &'static [MessageKind] {
        &[MessageKind::ControlMove]
    }

    fn control_move(&self, ctx: &mut EntityCtx<'_>, direction: DVec2) -> Dispatch {
        let magnitude = direction.length();
        let velocity = if magnitude == 0.0 {
            DVec2::ZERO
        } else {
            direction * (self.speed / magnitude)
        };
        ctx.set_velocity(velocity);
        Dispatch::Handled
    }
}
