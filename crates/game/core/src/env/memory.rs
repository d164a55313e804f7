use std::collections::BTreeMap;

use super::{EntityHandle, EntityStore, FactionId, GridSpatialIndex, Position};
use crate::effect::AttributeId;
use crate::response::ResponseListeners;
use crate::tag::EntityTags;

#[derive(Clone, Debug, Default)]
struct EntityRecord {
    generation: u32,
    alive: bool,
    position: Position,
    faction: FactionId,
    layer: u32,
    attributes: BTreeMap<AttributeId, i64>,
    tags: EntityTags,
    listeners: ResponseListeners,
}

/// In-memory [`EntityStore`] for tests and tools.
///
/// Despawned slots are reused with a bumped generation, so handles to the
/// old occupant become stale.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorld {
    records: Vec<EntityRecord>,
    free: Vec<u32>,
}

impl MemoryWorld {
    pub const DEFAULT_LAYER: u32 = 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, position: Position, faction: FactionId) -> EntityHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.records.push(EntityRecord::default());
                self.records.len() as u32 - 1
            }
        };
        let record = &mut self.records[index as usize];
        let generation = record.generation;
        *record = EntityRecord {
            generation,
            alive: true,
            position,
            faction,
            layer: Self::DEFAULT_LAYER,
            ..EntityRecord::default()
        };
        EntityHandle::from_parts(index, generation)
    }

    /// Returns false if the handle was already stale.
    pub fn despawn(&mut self, entity: EntityHandle) -> bool {
        let Some(record) = self.record_mut(entity) else {
            return false;
        };
        record.alive = false;
        record.generation = record.generation.wrapping_add(1);
        self.free.push(entity.index());
        true
    }

    fn record(&self, entity: EntityHandle) -> Option<&EntityRecord> {
        self.records
            .get(entity.index() as usize)
            .filter(|record| record.alive && record.generation == entity.generation())
    }

    fn record_mut(&mut self, entity: EntityHandle) -> Option<&mut EntityRecord> {
        self.records
            .get_mut(entity.index() as usize)
            .filter(|record| record.alive && record.generation == entity.generation())
    }

    pub fn set_position(&mut self, entity: EntityHandle, position: Position) {
        if let Some(record) = self.record_mut(entity) {
            record.position = position;
        }
    }

    pub fn set_layer(&mut self, entity: EntityHandle, layer: u32) {
        if let Some(record) = self.record_mut(entity) {
            record.layer = layer;
        }
    }

    pub fn listeners_mut(&mut self, entity: EntityHandle) -> Option<&mut ResponseListeners> {
        self.record_mut(entity).map(|record| &mut record.listeners)
    }

    /// Live handles in slot order.
    pub fn entities(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.alive)
            .map(|(index, record)| EntityHandle::from_parts(index as u32, record.generation))
    }

    pub fn len(&self) -> usize {
        self.entities().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a spatial index over every live entity's current position.
    pub fn spatial_index(&self, cell_size: i32) -> GridSpatialIndex {
        let mut index = GridSpatialIndex::new(cell_size);
        for entity in self.entities() {
            if let Some(position) = self.position(entity) {
                index.insert(entity, position);
            }
        }
        index
    }
}

impl EntityStore for MemoryWorld {
    fn is_alive(&self, entity: EntityHandle) -> bool {
        self.record(entity).is_some()
    }

    fn attribute(&self, entity: EntityHandle, attribute: AttributeId) -> Option<i64> {
        self.record(entity)?.attributes.get(&attribute).copied()
    }

    fn set_attribute(&mut self, entity: EntityHandle, attribute: AttributeId, value: i64) -> bool {
        match self.record_mut(entity) {
            Some(record) => {
                record.attributes.insert(attribute, value);
                true
            }
            None => false,
        }
    }

    fn tags(&self, entity: EntityHandle) -> Option<&EntityTags> {
        self.record(entity).map(|record| &record.tags)
    }

    fn tags_mut(&mut self, entity: EntityHandle) -> Option<&mut EntityTags> {
        self.record_mut(entity).map(|record| &mut record.tags)
    }

    fn listeners(&self, entity: EntityHandle) -> Option<&ResponseListeners> {
        self.record(entity).map(|record| &record.listeners)
    }

    fn position(&self, entity: EntityHandle) -> Option<Position> {
        self.record(entity).map(|record| record.position)
    }

    fn faction(&self, entity: EntityHandle) -> FactionId {
        self.record(entity)
            .map_or(FactionId::NEUTRAL, |record| record.faction)
    }

    fn layer(&self, entity: EntityHandle) -> u32 {
        self.record(entity).map_or(0, |record| record.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn despawned_handles_go_stale() {
        let mut world = MemoryWorld::new();
        let first = world.spawn(Position::new(1, 1), FactionId(1));
        world.set_attribute(first, AttributeId(0), 10);
        assert!(world.despawn(first));
        assert!(!world.despawn(first));

        let second = world.spawn(Position::new(2, 2), FactionId(2));
        assert_eq!(second.index(), first.index());
        assert_ne!(second, first);
        assert!(!world.is_alive(first));
        assert_eq!(world.attribute(first, AttributeId(0)), None);
        assert_eq!(world.attribute(second, AttributeId(0)), None);
        assert!(!world.set_attribute(first, AttributeId(0), 3));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn spatial_index_covers_live_entities() {
        let mut world = MemoryWorld::new();
        let a = world.spawn(Position::new(0, 0), FactionId(1));
        let b = world.spawn(Position::new(500, 0), FactionId(1));
        world.despawn(b);
        let index = world.spatial_index(1_000);
        assert_eq!(index.len(), 1);
        assert_eq!(world.faction(a), FactionId(1));
        assert_eq!(world.faction(b), FactionId::NEUTRAL);
    }
}
