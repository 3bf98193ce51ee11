//! Mapping between hecs entities and wire-level [`EntityId`]s.

use hecs::Entity;

use skirmish_core::types::EntityId;

pub fn to_id(entity: Entity) -> EntityId {
    EntityId(entity.to_bits().get())
}

/// `None` for ids that could never have come from [`to_id`].
pub fn from_id(id: EntityId) -> Option<Entity> {
    Entity::from_bits(id.0)
}
