use std::fmt;

use glam::DVec2;

use crate::api::error::{EngineError, Result};
use crate::api::types::{Axes, EntityId};
use crate::components::kinematics::Basis;
use crate::core::grid::Grid;
use crate::core::scheduler::{Scheduler, TimerHandle};
use crate::core::world::WorldEvent;
use crate::renderer::traits::Renderer;

/// Every message an entity understands.
///
/// Components declare which kinds they answer; the entity resolves those
/// declarations into per-kind routes once, when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Broadcast: the entity joined a world.
    Attach,
    /// Query: position at a given time.
    Position,
    /// Query: current velocity.
    Velocity,
    /// Query: bounding box size.
    Size,
    /// Broadcast: the kinematic basis changed.
    KinematicUpdate,
    /// Broadcast: a wall was struck.
    Collide,
    SetVelocity,
    ControlMove,
    /// Broadcast: the grid changed under the entity.
    MapChanged,
    Render,
}

impl MessageKind {
    pub const COUNT: usize = 10;

    pub fn index(self) -> usize {
        match self {
            MessageKind::Attach => 0,
            MessageKind::Position => 1,
            MessageKind::Velocity => 2,
            MessageKind::Size => 3,
            MessageKind::KinematicUpdate => 4,
            MessageKind::Collide => 5,
            MessageKind::SetVelocity => 6,
            MessageKind::ControlMove => 7,
            MessageKind::MapChanged => 8,
            MessageKind::Render => 9,
        }
    }
}

/// Whether a handler consumed a message. `Handled` stops dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    NotHandled,
}

impl Dispatch {
    pub fn is_handled(self) -> bool {
        self == Dispatch::Handled
    }
}

/// A capability-providing piece of an entity.
///
/// Components hold configuration only; per-entity mutable data lives in
/// [`EntityState`]. Every hook has a default that declines, so a component
/// overrides just the hooks it lists in [`Component::handles`].
pub trait Component: fmt::Debug {
    /// Message kinds this component answers.
    fn handles(&self) -> &'static [MessageKind];

    fn on_add(&self, _ctx: &mut EntityCtx<'_>) -> Dispatch {
        Dispatch::NotHandled
    }

    fn position(&self, _state: &EntityState, _now: f64) -> Option<DVec2> {
        None
    }

    fn velocity(&self, _state: &EntityState) -> Option<DVec2> {
        None
    }

    fn size(&self, _state: &EntityState) -> Option<DVec2> {
        None
    }

    fn on_kinematic_update(&self, _ctx: &mut EntityCtx<'_>) -> Dispatch {
        Dispatch::NotHandled
    }

    fn on_collide(&self, _ctx: &mut EntityCtx<'_>, _axes: Axes) -> Dispatch {
        Dispatch::NotHandled
    }

    fn set_velocity(&self, _ctx: &mut EntityCtx<'_>, _velocity: DVec2) -> Dispatch {
        Dispatch::NotHandled
    }

    fn control_move(&self, _ctx: &mut EntityCtx<'_>, _direction: DVec2) -> Dispatch {
        Dispatch::NotHandled
    }

    fn on_map_changed(&self, _ctx: &mut EntityCtx<'_>) -> Dispatch {
        Dispatch::NotHandled
    }

    fn render(
        &self,
        _view: &EntityView<'_>,
        _renderer: &mut dyn Renderer,
        _offset: DVec2,
        _now: f64,
    ) -> Dispatch {
        Dispatch::NotHandled
    }
}

/// Component indices per message kind, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Routes {
    table: [Vec<usize>; MessageKind::COUNT],
}

impl Routes {
    fn resolve(components: &[Box<dyn Component>]) -> Self {
        let mut routes = Routes::default();
        for (i, component) in components.iter().enumerate() {
            for kind in component.handles() {
                let route = &mut routes.table[kind.index()];
                if !route.contains(&i) {
                    route.push(i);
                }
            }
        }
        routes
    }

    pub fn get(&self, kind: MessageKind) -> &[usize] {
        &self.table[kind.index()]
    }
}

/// Per-entity mutable data shared by its components.
#[derive(Debug, Clone, Default)]
pub struct EntityState {
    /// Assigned when the entity is spawned.
    pub id: Option<EntityId>,
    /// Kinematic basis, installed by a moving position provider on attach.
    pub basis: Option<Basis>,
    /// The single pending collision-prediction timer, if any.
    pub collision_timer: Option<TimerHandle>,
}

/// An ordered bag of components plus the state they share.
#[derive(Debug)]
pub struct Entity {
    components: Vec<Box<dyn Component>>,
    routes: Routes,
    pub(crate) state: EntityState,
}

impl Entity {
    /// Build a detached entity. At least one component must provide position.
    pub fn new(components: Vec<Box<dyn Component>>) -> Result<Self> {
        let routes = Routes::resolve(&components);
        if routes.get(MessageKind::Position).is_empty() {
            return Err(EngineError::NoPositionProvider);
        }
        Ok(Self {
            components,
            routes,
            state: EntityState::default(),
        })
    }

    pub fn id(&self) -> Option<EntityId> {
        self.state.id
    }

    pub fn state(&self) -> &EntityState {
        &self.state
    }

    pub fn components(&self) -> &[Box<dyn Component>] {
        &self.components
    }

    pub fn view(&self) -> EntityView<'_> {
        EntityView {
            components: &self.components,
            routes: &self.routes,
            state: &self.state,
        }
    }

    pub(crate) fn ctx<'a>(
        &'a mut self,
        grid: &'a mut Grid,
        scheduler: &'a mut Scheduler<WorldEvent>,
    ) -> EntityCtx<'a> {
        EntityCtx {
            components: &self.components,
            routes: &self.routes,
            state: &mut self.state,
            grid,
            scheduler,
        }
    }
}

/// Read-only queries against an entity.
#[derive(Clone, Copy)]
pub struct EntityView<'a> {
    components: &'a [Box<dyn Component>],
    routes: &'a Routes,
    state: &'a EntityState,
}

impl<'a> EntityView<'a> {
    pub fn state(&self) -> &'a EntityState {
        self.state
    }

    /// Position at `now`. A lone provider is called directly.
    pub fn position(&self, now: f64) -> Option<DVec2> {
        match self.routes.get(MessageKind::Position) {
            [only] => self.components[*only].position(self.state, now),
            route => route
                .iter()
                .find_map(|&i| self.components[i].position(self.state, now)),
        }
    }

    /// Current velocity; zero when no component reports one.
    pub fn velocity(&self) -> DVec2 {
        self.routes
            .get(MessageKind::Velocity)
            .iter()
            .find_map(|&i| self.components[i].velocity(self.state))
            .unwrap_or(DVec2::ZERO)
    }

    /// Bounding box size; zero (a point) when no component reports one.
    pub fn size(&self) -> DVec2 {
        self.routes
            .get(MessageKind::Size)
            .iter()
            .find_map(|&i| self.components[i].size(self.state))
            .unwrap_or(DVec2::ZERO)
    }

    pub fn render(&self, renderer: &mut dyn Renderer, offset: DVec2, now: f64) -> Dispatch {
        for &i in self.routes.get(MessageKind::Render) {
            if self.components[i].render(self, renderer, offset, now).is_handled() {
                return Dispatch::Handled;
            }
        }
        Dispatch::NotHandled
    }
}

/// Mutable access to a live entity and the world around it, handed to
/// component hooks. Messages posted through it re-enter the entity's own
/// components.
pub struct EntityCtx<'a> {
    components: &'a [Box<dyn Component>],
    routes: &'a Routes,
    pub state: &'a mut EntityState,
    pub grid: &'a mut Grid,
    pub scheduler: &'a mut Scheduler<WorldEvent>,
}

impl<'a> EntityCtx<'a> {
    pub fn id(&self) -> Option<EntityId> {
        self.state.id
    }

    /// Current virtual time.
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn view(&self) -> EntityView<'_> {
        EntityView {
            components: self.components,
            routes: self.routes,
            state: &*self.state,
        }
    }

    pub fn position(&self, now: f64) -> Option<DVec2> {
        self.view().position(now)
    }

    pub fn velocity(&self) -> DVec2 {
        self.view().velocity()
    }

    pub fn size(&self) -> DVec2 {
        self.view().size()
    }

    /// Visit routed components in order until one handles the message.
    fn dispatch(
        &mut self,
        kind: MessageKind,
        mut call: impl FnMut(&'a dyn Component, &mut Self) -> Dispatch,
    ) -> Dispatch {
        let components = self.components;
        let routes = self.routes;
        for &i in routes.get(kind) {
            if call(components[i].as_ref(), self).is_handled() {
                return Dispatch::Handled;
            }
        }
        Dispatch::NotHandled
    }

    pub fn attach(&mut self) -> Dispatch {
        self.dispatch(MessageKind::Attach, |c, ctx| c.on_add(ctx))
    }

    pub fn kinematic_update(&mut self) -> Dispatch {
        self.dispatch(MessageKind::KinematicUpdate, |c, ctx| c.on_kinematic_update(ctx))
    }

    pub fn collide(&mut self, axes: Axes) -> Dispatch {
        self.dispatch(MessageKind::Collide, |c, ctx| c.on_collide(ctx, axes))
    }

    pub fn set_velocity(&mut self, velocity: DVec2) -> Dispatch {
        self.dispatch(MessageKind::SetVelocity, |c, ctx| c.set_velocity(ctx, velocity))
    }

    pub fn control_move(&mut self, direction: DVec2) -> Dispatch {
        self.dispatch(MessageKind::ControlMove, |c, ctx| c.control_move(ctx, direction))
    }

    pub fn map_changed(&mut self) -> Dispatch {
        self.dispatch(MessageKind::MapChanged, |c, ctx| c.on_map_changed(ctx))
    }
}
