//! Effect definitions and runtime records.
//!
//! Static side: [`EffectTemplate`]s reference a [`PresetType`] that fixes
//! which phases run, which lifetimes are legal, and which components a
//! template must carry. Runtime side: [`EffectRequest`]s flow through the
//! [`RequestQueue`], become [`EffectProposal`]s, and duration effects settle
//! into [`EffectInstance`]s.

mod granted;
mod handler;
mod instance;
mod lifetime;
mod modifier;
mod phase;
mod preset;
mod queue;
mod request;
mod template;
mod trigger;

pub use granted::{GrantedTag, TagFormula};
pub use handler::{NativeHandlerId, PhaseBinding, PhaseBindings, PhaseHandler};
pub use instance::{
    ActiveEffects, AppliedDelta, EffectInstance, EffectState, GrantedStacks, InstanceId,
};
pub use lifetime::{EffectLifetime, LifetimeFlags, LifetimeKind};
pub use modifier::{AttributeId, AttributeModifier, ModifierOp, ValueAdjust};
pub use phase::{EffectPhase, PhaseFlags, PhaseSlot};
pub use preset::{ComponentFlags, PresetBehaviorRegistry, PresetId, PresetRegistry, PresetType};
pub use queue::{PushOutcome, RequestQueue, RingBuffer};
pub use request::{EffectProposal, EffectRequest, ParamOverrides};
pub use template::{
    DurationPolicy, EffectTemplate, EffectTemplateRegistry, OverflowPolicy, SpawnDescriptor,
    StackPolicy, TemplateId,
};
pub use trigger::{
    ExpireConditionId, ExpireConditions, ExpireTrigger, TriggerContext, TriggerFactory,
    TriggerFactoryRegistry, TriggerParams,
};
