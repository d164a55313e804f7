use super::{EntityHandle, FactionId, Position};
use crate::effect::AttributeId;
use crate::response::ResponseListeners;
use crate::tag::EntityTags;

/// Entity storage the engine reads and mutates.
///
/// Every accessor takes a handle that may be stale; implementations return
/// `None` (or a neutral default) for dead entities rather than panicking.
pub trait EntityStore {
    fn is_alive(&self, entity: EntityHandle) -> bool;

    fn attribute(&self, entity: EntityHandle, attribute: AttributeId) -> Option<i64>;

    /// Returns false when the entity is dead.
    fn set_attribute(&mut self, entity: EntityHandle, attribute: AttributeId, value: i64) -> bool;

    fn tags(&self, entity: EntityHandle) -> Option<&EntityTags>;

    fn tags_mut(&mut self, entity: EntityHandle) -> Option<&mut EntityTags>;

    fn listeners(&self, entity: EntityHandle) -> Option<&ResponseListeners>;

    fn position(&self, entity: EntityHandle) -> Option<Position>;

    fn faction(&self, entity: EntityHandle) -> FactionId;

    /// Layer bitmask the entity occupies.
    fn layer(&self, entity: EntityHandle) -> u32;
}
