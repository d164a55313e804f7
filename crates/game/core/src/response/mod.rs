//! Response chain: listeners on entities that react to proposed effects.
//!
//! When a participating proposal reaches Propose, Apply or Period, the
//! target's target-scope listeners and the source's source-scope listeners
//! that match it are gathered into one window and fired by descending
//! priority. A window costs one window from the frame gas and every listener
//! evaluation costs one step.

mod chain;
mod listener;
mod telemetry;

pub use chain::{WindowOutcome, run_window};
pub use listener::{
    ListenerScope, ModifyOp, ResponseKind, ResponseListener, ResponseListeners, ResponseValue,
};
pub use telemetry::{ResponseAction, ResponseRecord, ResponseTelemetry};

use crate::effect::EffectPhase;
use crate::error::{CoreError, ErrorSeverity};

/// Phases at which response windows open.
pub const WINDOW_PHASES: [EffectPhase; 3] =
    [EffectPhase::Propose, EffectPhase::Apply, EffectPhase::Period];

/// Listener registration errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResponseError {
    #[error("entity already holds {capacity} response listeners")]
    ListenerCapacityExceeded { capacity: usize },
}

impl CoreError for ResponseError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Exhausted
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ListenerCapacityExceeded { .. } => "RESPONSE_LISTENERS_FULL",
        }
    }
}
