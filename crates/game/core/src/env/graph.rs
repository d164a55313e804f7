use std::fmt;

use arrayvec::ArrayVec;

use super::EntityHandle;
use crate::config::EngineConfig;
use crate::effect::{EffectPhase, TemplateId};

/// Identifier of an external graph program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgramId(pub u32);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program:{}", self.0)
    }
}

/// Context handed to a graph program.
#[derive(Clone, Copy, Debug)]
pub struct GraphInput<'a> {
    pub phase: EffectPhase,
    pub template: TemplateId,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: Option<EntityHandle>,
    pub stacks: u16,
    /// Current modifier magnitudes, one per template modifier.
    pub values: &'a [i64],
}

/// What a graph program produced.
///
/// For phase handlers `values[i]` replaces modifier `i`; for queries
/// `entities` is the candidate list; for tag formulas `values[0]` is the
/// stack count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphOutput {
    pub values: ArrayVec<i64, { EngineConfig::GRAPH_OUTPUT_VALUES }>,
    pub entities: ArrayVec<EntityHandle, { EngineConfig::MAX_CANDIDATES }>,
    pub cancel: bool,
}

impl GraphOutput {
    pub fn clear(&mut self) {
        self.values.clear();
        self.entities.clear();
        self.cancel = false;
    }
}

/// A graph program failed. The engine treats this as a soft skip.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("graph program {0} not found")]
    ProgramNotFound(ProgramId),

    #[error("graph program {program} faulted: {reason}")]
    Faulted {
        program: ProgramId,
        reason: &'static str,
    },
}

/// Host that runs graph programs as opaque callables.
pub trait GraphHost {
    /// Runs `program`, writing into a cleared `output`.
    fn run(
        &self,
        program: ProgramId,
        input: &GraphInput<'_>,
        output: &mut GraphOutput,
    ) -> Result<(), GraphError>;
}

impl crate::error::CoreError for GraphError {
    fn severity(&self) -> crate::error::ErrorSeverity {
        crate::error::ErrorSeverity::Skipped
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ProgramNotFound(_) => "GRAPH_PROGRAM_NOT_FOUND",
            Self::Faulted { .. } => "GRAPH_PROGRAM_FAULTED",
        }
    }
}
