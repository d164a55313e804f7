//! Common error infrastructure for gameplay-core.
//!
//! Domain errors live beside the code that raises them (`TagError` in
//! [`crate::tag`], `RegistryError` in [`crate::registry`], `EnvError` in
//! [`crate::env`]). This module holds the shared severity classification and
//! the top-level [`EngineError`] returned by the frame pipeline.
//!
//! # Taxonomy
//!
//! - **Configuration**: malformed content rejected at load time.
//! - **Invariant**: a data bug surfaced at runtime (tag stack overflow). These
//!   are always returned as `Err` and never swallowed.
//! - **Exhausted**: a soft budget ran out. The pipeline counts these instead
//!   of returning them; the variant exists so counters and logs can share one
//!   vocabulary.
//! - **Skipped**: a single item was ignored (missing template, dead target).

use crate::effect::{EffectPhase, NativeHandlerId, PhaseSlot};
use crate::env::EnvError;
use crate::tag::TagError;

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Invalid content; abort the registration that produced it.
    Configuration,

    /// Recorded state would desync from effective state; fatal to the operation.
    Invariant,

    /// A fixed budget ran out; the offending work item is dropped and counted.
    Exhausted,

    /// A single item was skipped (missing template, stale entity).
    Skipped,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Invariant => "invariant",
            Self::Exhausted => "exhausted",
            Self::Skipped => "skipped",
        }
    }

    /// Returns true if the simulation keeps running after this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Skipped)
    }

    /// Returns true if this error indicates a data bug.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant)
    }
}

/// Common trait for all gameplay-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity by what the caller must do, not by impact
pub trait CoreError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Errors that abort a frame (or the call that triggered them).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Tag container invariant violated while applying or revoking tags.
    #[error(transparent)]
    Tag(#[from] TagError),

    /// A collaborator required by the current phase was not supplied.
    #[error(transparent)]
    Env(#[from] EnvError),

    /// A phase binding references a native handler that is not registered.
    #[error("native handler {0} is not registered")]
    UnknownNativeHandler(NativeHandlerId),

    /// A phase handler failed; `source` holds the cause.
    #[error("{phase} {slot} handler failed: {source}")]
    Handler {
        phase: EffectPhase,
        slot: PhaseSlot,
        source: Box<EngineError>,
    },
}

impl CoreError for EngineError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Tag(e) => e.severity(),
            Self::Env(e) => e.severity(),
            Self::UnknownNativeHandler(_) => ErrorSeverity::Configuration,
            Self::Handler { source, .. } => source.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Tag(e) => e.error_code(),
            Self::Env(e) => e.error_code(),
            Self::UnknownNativeHandler(_) => "ENGINE_UNKNOWN_NATIVE_HANDLER",
            Self::Handler { source, .. } => source.error_code(),
        }
    }
}
