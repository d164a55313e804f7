use arrayvec::ArrayVec;

use super::{AttributeId, ExpireConditionId, TemplateId};
use crate::budget::RootId;
use crate::clock::{ClockDomain, Tick};
use crate::config::EngineConfig;
use crate::env::EntityHandle;
use crate::tag::TagId;

/// Unique id of an active effect instance within one engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceId(pub u64);

/// Lifecycle state of a proposal or instance.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum EffectState {
    #[default]
    Created,
    Pending,
    /// Response listeners are contending over the proposal.
    Trigger,
    Calculate,
    Apply,
    Committed,
    Cancelled,
}

impl EffectState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }
}

/// Cumulative delta one modifier slot has applied to an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AppliedDelta {
    pub attribute: AttributeId,
    pub delta: i64,
}

/// Stacks of a tag an instance currently grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GrantedStacks {
    pub tag: TagId,
    pub stacks: u16,
}

/// A duration effect living on a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectInstance {
    pub id: InstanceId,
    pub template: TemplateId,
    pub root: RootId,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: Option<EntityHandle>,
    pub clock: ClockDomain,
    pub started_at: Tick,
    /// Full duration in ticks (0 for infinite).
    pub total_ticks: u32,
    /// `None` for infinite lifetimes.
    pub expires_at: Option<Tick>,
    pub period_ticks: u32,
    pub next_period: Option<Tick>,
    pub expire_condition: Option<ExpireConditionId>,
    pub state: EffectState,
    pub stacks: u16,
    /// Percentage applied to modifier values, from overrides and response adjustments.
    pub value_scale_percent: i64,
    pub applied: ArrayVec<AppliedDelta, { EngineConfig::MAX_MODIFIERS }>,
    pub granted: ArrayVec<GrantedStacks, { EngineConfig::MAX_GRANTED_TAGS }>,
    pub depth: u8,
}

impl EffectInstance {
    /// Ticks left before expiry, or `None` for infinite lifetimes.
    pub fn remaining_ticks(&self, now: Tick) -> Option<u64> {
        self.expires_at.map(|expiry| now.until(expiry))
    }

    pub fn is_expired(&self, now: Tick) -> bool {
        self.expires_at.is_some_and(|expiry| now >= expiry)
    }

    /// Adds `delta` to the running total for modifier slot `index`.
    pub fn record_delta(&mut self, index: usize, attribute: AttributeId, delta: i64) {
        while self.applied.len() <= index && !self.applied.is_full() {
            self.applied.push(AppliedDelta {
                attribute,
                delta: 0,
            });
        }
        if let Some(slot) = self.applied.get_mut(index) {
            slot.attribute = attribute;
            slot.delta = slot.delta.saturating_add(delta);
        }
    }

    pub fn granted_stacks(&self, tag: TagId) -> u16 {
        self.granted
            .iter()
            .find(|granted| granted.tag == tag)
            .map_or(0, |granted| granted.stacks)
    }

    pub fn set_granted_stacks(&mut self, tag: TagId, stacks: u16) {
        match self.granted.iter_mut().find(|granted| granted.tag == tag) {
            Some(granted) => granted.stacks = stacks,
            None => {
                let _ = self.granted.try_push(GrantedStacks { tag, stacks });
            }
        }
    }
}

/// Active instances in creation order.
#[derive(Clone, Debug, Default)]
pub struct ActiveEffects {
    instances: ArrayVec<EffectInstance, { EngineConfig::MAX_ACTIVE_EFFECTS }>,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.instances.is_full()
    }

    /// Gives the instance back when at capacity.
    pub fn insert(&mut self, instance: EffectInstance) -> Result<(), EffectInstance> {
        self.instances.try_push(instance).map_err(|err| err.element())
    }

    pub fn get(&self, id: InstanceId) -> Option<&EffectInstance> {
        self.instances.iter().find(|instance| instance.id == id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut EffectInstance> {
        self.instances.iter_mut().find(|instance| instance.id == id)
    }

    /// The instance of `template` already stacking on `target`, if any.
    pub fn find_stack_mut(
        &mut self,
        template: TemplateId,
        target: EntityHandle,
    ) -> Option<&mut EffectInstance> {
        self.instances
            .iter_mut()
            .find(|instance| instance.template == template && instance.target == target)
    }

    /// Removes an instance, keeping the others in creation order.
    pub fn remove(&mut self, id: InstanceId) -> Option<EffectInstance> {
        let index = self.instances.iter().position(|instance| instance.id == id)?;
        Some(self.instances.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectInstance> {
        self.instances.iter()
    }

    /// Ids in creation order, for iteration while mutating.
    pub fn ids(&self) -> ArrayVec<InstanceId, { EngineConfig::MAX_ACTIVE_EFFECTS }> {
        self.instances.iter().map(|instance| instance.id).collect()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}
