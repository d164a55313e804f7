//! Collaborator access errors.

use crate::error::{CoreError, ErrorSeverity};

/// A collaborator the current phase needs was not supplied in the [`super::Env`].
///
/// These are wiring mistakes, so they are configuration errors and surface
/// the first time a template that needs the collaborator runs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnvError {
    /// No [`super::ClockSource`] in the environment.
    #[error("ClockSource not available")]
    ClockNotAvailable,

    /// No [`super::SpatialQuery`] in the environment.
    #[error("SpatialQuery not available")]
    SpatialNotAvailable,

    /// No [`super::GraphHost`] in the environment.
    #[error("GraphHost not available")]
    GraphNotAvailable,
}

impl CoreError for EnvError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Configuration
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ClockNotAvailable => "ENV_CLOCK_NOT_AVAILABLE",
            Self::SpatialNotAvailable => "ENV_SPATIAL_NOT_AVAILABLE",
            Self::GraphNotAvailable => "ENV_GRAPH_NOT_AVAILABLE",
        }
    }
}
