use bitflags::bitflags;

use crate::env::{EntityHandle, EntityStore, FactionId, Position};

bitflags! {
    /// Relationships between a candidate and the effect source that a filter accepts.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct RelationFlags: u8 {
        const SELF    = 1 << 0;
        const ALLY    = 1 << 1;
        const ENEMY   = 1 << 2;
        const NEUTRAL = 1 << 3;
    }
}

impl Default for RelationFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl RelationFlags {
    /// Relationship of `candidate` to `source`.
    pub fn between(
        source: EntityHandle,
        candidate: EntityHandle,
        source_faction: FactionId,
        candidate_faction: FactionId,
    ) -> Self {
        if source == candidate {
            Self::SELF
        } else if source_faction.is_neutral() || candidate_faction.is_neutral() {
            Self::NEUTRAL
        } else if source_faction == candidate_faction {
            Self::ALLY
        } else {
            Self::ENEMY
        }
    }

    pub fn allows(&self, relation: RelationFlags) -> bool {
        self.intersects(relation)
    }
}

/// Candidate validation applied during the Hit phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct FilterDescriptor {
    pub exclude_source: bool,
    /// Maximum children emitted; 0 means no limit beyond the candidate list.
    pub max_targets: u16,
    pub relations: RelationFlags,
    /// Candidate layers accepted (bitmask).
    pub layer_mask: u32,
}

impl Default for FilterDescriptor {
    fn default() -> Self {
        Self {
            exclude_source: false,
            max_targets: 0,
            relations: RelationFlags::all(),
            layer_mask: u32::MAX,
        }
    }
}

impl FilterDescriptor {
    pub fn with_max_targets(mut self, max_targets: u16) -> Self {
        self.max_targets = max_targets;
        self
    }

    pub fn excluding_source(mut self) -> Self {
        self.exclude_source = true;
        self
    }

    pub fn with_relations(mut self, relations: RelationFlags) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_layer_mask(mut self, layer_mask: u32) -> Self {
        self.layer_mask = layer_mask;
        self
    }

    /// True once `emitted` children reach the target cap.
    pub fn is_saturated(&self, emitted: usize) -> bool {
        self.max_targets != 0 && emitted >= self.max_targets as usize
    }

    /// Per-candidate checks, not counting the target cap.
    pub fn accepts(
        &self,
        world: &dyn EntityStore,
        source: EntityHandle,
        candidate: EntityHandle,
        center: Position,
        ring_inner: Option<i32>,
    ) -> bool {
        if !world.is_alive(candidate) {
            return false;
        }
        if self.exclude_source && candidate == source {
            return false;
        }
        if world.layer(candidate) & self.layer_mask == 0 {
            return false;
        }
        let relation =
            RelationFlags::between(source, candidate, world.faction(source), world.faction(candidate));
        if !self.relations.allows(relation) {
            return false;
        }
        match (ring_inner, world.position(candidate)) {
            (Some(inner), Some(position)) => center.distance_sq(position) >= (inner as i64).pow(2),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}
