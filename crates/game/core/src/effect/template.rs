use std::fmt;

use arrayvec::ArrayVec;

use super::{
    AttributeModifier, ComponentFlags, EffectLifetime, EffectPhase, ExpireConditionId,
    GrantedTag, LifetimeKind, PhaseBinding, PhaseBindings, PresetId,
};
use crate::config::EngineConfig;
use crate::tag::TagId;
use crate::targeting::TargetingDescriptor;

/// Registry index of an effect template. Id 0 is the listener wildcard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateId(pub u32);

impl TemplateId {
    pub const WILDCARD: Self = Self(0);

    pub fn is_wildcard(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template:{}", self.0)
    }
}

/// What re-applying a stacked effect does to its remaining duration.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DurationPolicy {
    /// Reset the remaining ticks to the full duration.
    #[default]
    Refresh,
    /// Extend the remaining ticks by the full duration.
    Add,
    /// Leave the remaining ticks unchanged.
    Keep,
}

/// What re-applying at the stack limit does.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OverflowPolicy {
    /// The new application is rejected.
    #[default]
    RejectNew,
    /// The oldest stack is replaced: the count stays at the limit and the
    /// duration policy applies.
    RemoveOldest,
}

/// Stacking behavior of a duration effect on one target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackPolicy {
    pub duration: DurationPolicy,
    pub limit: u16,
    pub overflow: OverflowPolicy,
}

impl StackPolicy {
    pub fn new(limit: u16, duration: DurationPolicy, overflow: OverflowPolicy) -> Self {
        Self {
            duration,
            limit,
            overflow,
        }
    }
}

/// Entities a spawning preset asks the host to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnDescriptor {
    /// Host-defined archetype key.
    pub archetype: u32,
    pub count: u8,
}

/// Immutable definition of an effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectTemplate {
    pub id: TemplateId,
    pub preset: PresetId,
    pub lifetime: EffectLifetime,
    pub modifiers: ArrayVec<AttributeModifier, { EngineConfig::MAX_MODIFIERS }>,
    pub granted_tags: ArrayVec<GrantedTag, { EngineConfig::MAX_GRANTED_TAGS }>,
    /// No query means 1:1 application with no fan-out.
    pub targeting: TargetingDescriptor,
    pub bindings: PhaseBindings,
    pub stack: Option<StackPolicy>,
    /// Tag response listeners match this effect by.
    pub event_tag: Option<TagId>,
    /// Whether proposals of this template open response windows.
    pub response_chain: bool,
    pub expire_condition: Option<ExpireConditionId>,
    pub spawn: Option<SpawnDescriptor>,
}

impl EffectTemplate {
    pub fn new(id: TemplateId, preset: PresetId, lifetime: EffectLifetime) -> Self {
        Self {
            id,
            preset,
            lifetime,
            modifiers: ArrayVec::new(),
            granted_tags: ArrayVec::new(),
            targeting: TargetingDescriptor::default(),
            bindings: PhaseBindings::default(),
            stack: None,
            event_tag: None,
            response_chain: true,
            expire_condition: None,
            spawn: None,
        }
    }

    /// Panics past [`EngineConfig::MAX_MODIFIERS`]; loaders check capacity first.
    pub fn with_modifier(mut self, modifier: AttributeModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Panics past [`EngineConfig::MAX_GRANTED_TAGS`]; loaders check capacity first.
    pub fn with_granted_tag(mut self, granted: GrantedTag) -> Self {
        self.granted_tags.push(granted);
        self
    }

    pub fn with_targeting(mut self, targeting: TargetingDescriptor) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn with_binding(mut self, phase: EffectPhase, binding: PhaseBinding) -> Self {
        self.bindings.set(phase, binding);
        self
    }

    pub fn with_stack(mut self, stack: StackPolicy) -> Self {
        self.stack = Some(stack);
        self
    }

    pub fn with_event_tag(mut self, tag: TagId) -> Self {
        self.event_tag = Some(tag);
        self
    }

    pub fn with_response_chain(mut self, participates: bool) -> Self {
        self.response_chain = participates;
        self
    }

    pub fn with_expire_condition(mut self, condition: ExpireConditionId) -> Self {
        self.expire_condition = Some(condition);
        self
    }

    pub fn with_spawn(mut self, spawn: SpawnDescriptor) -> Self {
        self.spawn = Some(spawn);
        self
    }

    pub fn is_instant(&self) -> bool {
        self.lifetime.kind.is_instant()
    }

    /// Components this template carries, for preset validation.
    pub fn components(&self) -> ComponentFlags {
        let mut flags = ComponentFlags::empty();
        flags.set(ComponentFlags::MODIFIERS, !self.modifiers.is_empty());
        flags.set(ComponentFlags::GRANTED_TAGS, !self.granted_tags.is_empty());
        flags.set(ComponentFlags::TARGET_QUERY, self.targeting.query.is_some());
        flags.set(ComponentFlags::TARGET_FILTER, self.targeting.filter.is_some());
        flags.set(ComponentFlags::TARGET_DISPATCH, self.targeting.dispatch.is_some());
        flags.set(ComponentFlags::PERIOD, self.lifetime.period_ticks > 0);
        flags.set(ComponentFlags::STACK_POLICY, self.stack.is_some());
        flags.set(
            ComponentFlags::DURATION,
            self.lifetime.kind == LifetimeKind::AfterTicks,
        );
        flags.set(ComponentFlags::SPAWN, self.spawn.is_some());
        flags
    }
}

/// Templates indexed by [`TemplateId`]. Read-only once loading finishes.
#[derive(Clone, Debug, Default)]
pub struct EffectTemplateRegistry {
    templates: Vec<Option<EffectTemplate>>,
    count: usize,
}

impl EffectTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a template. Last write wins; replacing one is logged as a conflict.
    pub fn insert(&mut self, template: EffectTemplate) {
        let id = template.id;
        let index = id.0 as usize;
        if self.templates.len() <= index {
            self.templates.resize(index + 1, None);
        }
        match self.templates[index].replace(template) {
            Some(_) => tracing::warn!(%id, "effect template re-registered; last write wins"),
            None => self.count += 1,
        }
    }

    pub fn get(&self, id: TemplateId) -> Option<&EffectTemplate> {
        self.templates.get(id.0 as usize)?.as_ref()
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectTemplate> {
        self.templates.iter().flatten()
    }

    pub fn clear(&mut self) {
        self.templates.clear();
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockDomain;
    use crate::effect::AttributeId;

    #[test]
    fn components_reflect_contents() {
        let template = EffectTemplate::new(
            TemplateId(3),
            PresetId::DOT,
            EffectLifetime::after_ticks(ClockDomain::FixedFrame, 3).with_period(1),
        )
        .with_modifier(AttributeModifier::add(AttributeId(0), -2))
        .with_stack(StackPolicy::new(3, DurationPolicy::Refresh, OverflowPolicy::RemoveOldest));

        let components = template.components();
        assert!(components.contains(
            ComponentFlags::MODIFIERS
                | ComponentFlags::PERIOD
                | ComponentFlags::DURATION
                | ComponentFlags::STACK_POLICY
        ));
        assert!(!components.intersects(ComponentFlags::TARGETING));
    }

    #[test]
    fn re_registration_is_last_write_wins() {
        let mut registry = EffectTemplateRegistry::new();
        let first = EffectTemplate::new(TemplateId(2), PresetId::BUFF, EffectLifetime::default());
        let second = EffectTemplate::new(TemplateId(2), PresetId::DOT, EffectLifetime::default());
        registry.insert(first);
        registry.insert(second);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(TemplateId(2)).map(|t| t.preset), Some(PresetId::DOT));
        assert!(registry.get(TemplateId(7)).is_none());
    }
}
