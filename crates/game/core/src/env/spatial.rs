use std::collections::BTreeMap;

use arrayvec::ArrayVec;

use super::{EntityHandle, Position};
use crate::config::EngineConfig;
use crate::targeting::{Facing, QueryShape};

/// Bounded candidate buffer filled by spatial and graph queries.
pub type CandidateList = ArrayVec<EntityHandle, { EngineConfig::MAX_CANDIDATES }>;

/// One spatial query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpatialRequest {
    pub center: Position,
    pub shape: QueryShape,
    pub facing: Facing,
    /// Maximum handles to return (clamped to the candidate capacity).
    pub limit: usize,
}

/// Spatial backend. Results must be deterministic for identical inputs.
pub trait SpatialQuery {
    /// Appends up to `request.limit` matching handles to `out`.
    fn query(&self, request: &SpatialRequest, out: &mut CandidateList);
}

/// Uniform-grid spatial index over entity positions.
///
/// Results are ordered by distance from the center, ties by handle.
#[derive(Clone, Debug)]
pub struct GridSpatialIndex {
    cell_size: i32,
    cells: BTreeMap<(i32, i32), Vec<(EntityHandle, Position)>>,
}

impl GridSpatialIndex {
    pub const DEFAULT_CELL_SIZE: i32 = 4_000;

    pub fn new(cell_size: i32) -> Self {
        Self {
            cell_size: cell_size.max(1),
            cells: BTreeMap::new(),
        }
    }

    fn cell_of(&self, position: Position) -> (i32, i32) {
        (
            position.x.div_euclid(self.cell_size),
            position.y.div_euclid(self.cell_size),
        )
    }

    pub fn insert(&mut self, entity: EntityHandle, position: Position) {
        let cell = self.cell_of(position);
        self.cells.entry(cell).or_default().push((entity, position));
    }

    pub fn remove(&mut self, entity: EntityHandle) {
        for entries in self.cells.values_mut() {
            entries.retain(|(handle, _)| *handle != entity);
        }
        self.cells.retain(|_, entries| !entries.is_empty());
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Default for GridSpatialIndex {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CELL_SIZE)
    }
}

impl SpatialQuery for GridSpatialIndex {
    fn query(&self, request: &SpatialRequest, out: &mut CandidateList) {
        let reach = request.shape.reach();
        let clamp = |value: i64| value.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        let min = self.cell_of(Position::new(
            clamp(request.center.x as i64 - reach),
            clamp(request.center.y as i64 - reach),
        ));
        let max = self.cell_of(Position::new(
            clamp(request.center.x as i64 + reach),
            clamp(request.center.y as i64 + reach),
        ));

        let mut hits: Vec<(i64, EntityHandle)> = self
            .cells
            .range(min..=max)
            .filter(|((_, y), _)| (min.1..=max.1).contains(y))
            .flat_map(|(_, entries)| entries.iter())
            .filter(|(_, position)| {
                request
                    .shape
                    .contains(request.center, request.facing, *position)
            })
            .map(|(handle, position)| (request.center.distance_sq(*position), *handle))
            .collect();
        hits.sort_unstable();

        let room = out.remaining_capacity().min(request.limit);
        out.extend(hits.into_iter().take(room).map(|(_, handle)| handle));
    }
}
