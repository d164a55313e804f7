//! Collaborators the engine consumes but does not own.
//!
//! Entity storage, spatial queries, graph programs, and clocks are all
//! external. The [`Env`] aggregate bundles the read-only ones so the pipeline
//! can reach them without hard coupling to concrete implementations; entity
//! storage is passed separately because the pipeline mutates it.
//! [`MemoryWorld`] and [`GridSpatialIndex`] are reference implementations.
mod entity;
mod error;
mod graph;
mod memory;
mod spatial;
mod store;

use std::fmt;

pub use entity::{EntityHandle, FactionId, Position};
pub use error::EnvError;
pub use graph::{GraphError, GraphHost, GraphInput, GraphOutput, ProgramId};
pub use memory::MemoryWorld;
pub use spatial::{CandidateList, GridSpatialIndex, SpatialQuery, SpatialRequest};
pub use store::EntityStore;

use crate::clock::ClockSource;

/// Aggregates the read-only collaborators required by the pipeline.
pub struct Env<'a, C, S, G>
where
    C: ClockSource + ?Sized,
    S: SpatialQuery + ?Sized,
    G: GraphHost + ?Sized,
{
    clock: Option<&'a C>,
    spatial: Option<&'a S>,
    graph: Option<&'a G>,
}

pub type EngineEnv<'a> =
    Env<'a, dyn ClockSource + 'a, dyn SpatialQuery + 'a, dyn GraphHost + 'a>;

impl<C, S, G> Clone for Env<'_, C, S, G>
where
    C: ClockSource + ?Sized,
    S: SpatialQuery + ?Sized,
    G: GraphHost + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, S, G> Copy for Env<'_, C, S, G>
where
    C: ClockSource + ?Sized,
    S: SpatialQuery + ?Sized,
    G: GraphHost + ?Sized,
{
}

impl<C, S, G> fmt::Debug for Env<'_, C, S, G>
where
    C: ClockSource + ?Sized,
    S: SpatialQuery + ?Sized,
    G: GraphHost + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("clock", &self.clock.is_some())
            .field("spatial", &self.spatial.is_some())
            .field("graph", &self.graph.is_some())
            .finish()
    }
}

impl<'a, C, S, G> Env<'a, C, S, G>
where
    C: ClockSource + ?Sized,
    S: SpatialQuery + ?Sized,
    G: GraphHost + ?Sized,
{
    pub fn new(clock: Option<&'a C>, spatial: Option<&'a S>, graph: Option<&'a G>) -> Self {
        Self {
            clock,
            spatial,
            graph,
        }
    }

    pub fn with_all(clock: &'a C, spatial: &'a S, graph: &'a G) -> Self {
        Self::new(Some(clock), Some(spatial), Some(graph))
    }

    pub fn empty() -> Self {
        Self::new(None, None, None)
    }

    pub fn with_clock(mut self, clock: &'a C) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_spatial(mut self, spatial: &'a S) -> Self {
        self.spatial = Some(spatial);
        self
    }

    pub fn with_graph(mut self, graph: &'a G) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Returns the ClockSource, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `EnvError::ClockNotAvailable` if no clock was provided.
    pub fn clock(&self) -> Result<&'a C, EnvError> {
        self.clock.ok_or(EnvError::ClockNotAvailable)
    }

    /// Returns the SpatialQuery, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `EnvError::SpatialNotAvailable` if no spatial backend was provided.
    pub fn spatial(&self) -> Result<&'a S, EnvError> {
        self.spatial.ok_or(EnvError::SpatialNotAvailable)
    }

    /// Returns the GraphHost, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `EnvError::GraphNotAvailable` if no graph host was provided.
    pub fn graph(&self) -> Result<&'a G, EnvError> {
        self.graph.ok_or(EnvError::GraphNotAvailable)
    }
}

impl<'a, C, S, G> Env<'a, C, S, G>
where
    C: ClockSource + 'a,
    S: SpatialQuery + 'a,
    G: GraphHost + 'a,
{
    /// Converts this environment into a trait-object based `EngineEnv`.
    pub fn into_engine_env(self) -> EngineEnv<'a> {
        let clock: Option<&'a dyn ClockSource> = self.clock.map(|clock| clock as _);
        let spatial: Option<&'a dyn SpatialQuery> = self.spatial.map(|spatial| spatial as _);
        let graph: Option<&'a dyn GraphHost> = self.graph.map(|graph| graph as _);
        Env::new(clock, spatial, graph)
    }
}
