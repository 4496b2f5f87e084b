use crate::api::types::EntityId;
use crate::components::entity::Entity;

/// Simple entity storage using a flat Vec, kept in spawn order.
/// Designed for small-to-medium entity counts (hundreds, not millions).
/// Only entities that carry an id are stored.
#[derive(Debug)]
pub struct Scene {
    entities: Vec<Entity>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            entities: Vec::with_capacity(64),
        }
    }

    /// Create a scene with a specific entity capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
        }
    }

    /// Add an entity to the scene. The entity must already have an id.
    pub(crate) fn spawn(&mut self, entity: Entity) {
        debug_assert!(entity.id().is_some(), "scene entities need an id");
        self.entities.push(entity);
    }

    /// Remove an entity by ID. Returns the removed entity if found.
    pub(crate) fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let idx = self.entities.iter().position(|e| e.id() == Some(id))?;
        Some(self.entities.remove(idx))
    }

    /// Get a reference to an entity by ID.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == Some(id))
    }

    /// Get a mutable reference to an entity by ID.
    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == Some(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over all entities in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Ids of all entities in spawn order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().filter_map(Entity::id)
    }

    /// Number of entities in the scene.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
