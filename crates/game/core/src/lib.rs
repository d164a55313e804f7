//! Deterministic gameplay-effect and tag-rule engine.
//!
//! `gameplay-core` runs a fixed-tick pipeline that mutates entity attributes
//! and gameplay tags through a phased effect lifecycle
//! (propose → calculate → resolve → hit → apply → period → expire → remove).
//! Other entities can intercept, modify, or chain off any proposed effect via
//! the response chain, and one effect can fan out into many child requests
//! through spatial or graph-driven targeting.
//!
//! Every container is fixed-capacity and every cascade is budgeted, so a frame
//! always terminates in bounded work even when content data is cyclic or
//! adversarial. All state mutation flows through [`engine::EffectEngine`];
//! static catalogs live in [`registry::Registries`] and are passed by
//! reference instead of living in globals.
pub mod budget;
pub mod clock;
pub mod config;
pub mod effect;
pub mod engine;
pub mod env;
pub mod error;
pub mod registry;
pub mod response;
pub mod tag;
pub mod targeting;

pub use budget::{BudgetScope, BudgetSummary, DropReason, GasBudget, RootBudgetTable, RootId, SkipReason};
pub use clock::{ClockDomain, ClockSource, Clocks, Tick};
pub use config::EngineConfig;
pub use effect::{
    AttributeId, AttributeModifier, ComponentFlags, DurationPolicy, EffectInstance, EffectLifetime,
    EffectPhase, EffectProposal, EffectRequest, EffectState, EffectTemplate, GrantedTag, InstanceId,
    LifetimeFlags, LifetimeKind, ModifierOp, NativeHandlerId, OverflowPolicy, ParamOverrides,
    PhaseBinding, PhaseFlags, PhaseHandler, PresetId, PresetType, RequestQueue, StackPolicy,
    TagFormula, TemplateId, ValueAdjust,
};
pub use engine::{
    EffectEngine, FrameDigest, FrameReport, NativeHandler, NativeHandlerRegistry, PhaseContext,
    Resolution, ResolutionOutcome, SpawnIntent, SpawnKind,
};
pub use env::{
    EngineEnv, EntityHandle, EntityStore, Env, EnvError, FactionId, GraphHost, GraphInput,
    GraphOutput, GridSpatialIndex, MemoryWorld, Position, ProgramId, SpatialQuery, SpatialRequest,
};
pub use error::{CoreError, EngineError, ErrorSeverity};
pub use registry::{Registries, RegistryError};
pub use response::{
    ListenerScope, ModifyOp, ResponseKind, ResponseListener, ResponseListeners, ResponseRecord,
    ResponseTelemetry, ResponseValue,
};
pub use tag::{
    AddOutcome, DirtyTags, EntityTags, RemoveOutcome, TagError, TagId, TagOps, TagRuleCompiled,
    TagRuleError, TagRuleRegistry, TagRuleSet, TagRuleTransaction, TagSense, TagSet,
};
pub use targeting::{
    ContextSlot, DispatchDescriptor, Facing, FilterDescriptor, QueryDescriptor, QueryShape,
    RelationFlags, TargetingDescriptor,
};
