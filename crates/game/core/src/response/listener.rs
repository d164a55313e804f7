use arrayvec::ArrayVec;

use super::ResponseError;
use crate::config::EngineConfig;
use crate::effect::{EffectPhase, TemplateId};
use crate::env::ProgramId;
use crate::tag::TagId;
use crate::targeting::ContextSlot;

/// Which role the listener owner must play in the proposal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ListenerScope {
    /// Owner is the proposal target.
    #[default]
    Target,
    /// Owner is the proposal source.
    Source,
}

/// How a Modify response changes the proposal's magnitudes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ModifyOp {
    /// Add to every modifier value.
    Add,
    /// Scale every modifier value by a percentage.
    Scale,
    /// Replace every modifier value.
    Override,
}

/// Parameter of a response: static, or computed by a graph program (`values[0]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResponseValue {
    Static(i64),
    Graph(ProgramId),
}

/// What a listener does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResponseKind {
    /// Cancels the proposal, or only when the condition program sets `cancel`.
    Hook { condition: Option<ProgramId> },
    Modify { op: ModifyOp, value: ResponseValue },
    /// Queues a child request from the owner toward `target`
    /// (`Candidate` names the owner itself).
    Chain { template: TemplateId, target: ContextSlot },
    /// Asks the ability layer for input; recorded only.
    PromptInput { prompt: u32 },
}

/// One observer registered on an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponseListener {
    /// `None` matches every event tag.
    pub event_tag: Option<TagId>,
    /// [`TemplateId::WILDCARD`] matches every template.
    pub effect: TemplateId,
    pub phase: EffectPhase,
    pub scope: ListenerScope,
    pub kind: ResponseKind,
    /// Higher fires first.
    pub priority: i32,
    /// Insertion order on the owner; assigned by [`ResponseListeners::push`].
    pub sequence: u32,
}

impl ResponseListener {
    pub fn new(phase: EffectPhase, scope: ListenerScope, kind: ResponseKind) -> Self {
        Self {
            event_tag: None,
            effect: TemplateId::WILDCARD,
            phase,
            scope,
            kind,
            priority: 0,
            sequence: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_event_tag(mut self, tag: TagId) -> Self {
        self.event_tag = Some(tag);
        self
    }

    pub fn with_effect(mut self, template: TemplateId) -> Self {
        self.effect = template;
        self
    }

    pub fn matches(&self, phase: EffectPhase, event_tag: Option<TagId>, template: TemplateId) -> bool {
        self.phase == phase
            && self.event_tag.is_none_or(|tag| event_tag == Some(tag))
            && (self.effect.is_wildcard() || self.effect == template)
    }
}

/// Per-entity listener list in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponseListeners {
    entries: ArrayVec<ResponseListener, { EngineConfig::MAX_LISTENERS }>,
    next_sequence: u32,
}

impl ResponseListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener and returns its sequence number.
    pub fn push(&mut self, mut listener: ResponseListener) -> Result<u32, ResponseError> {
        if self.entries.is_full() {
            return Err(ResponseError::ListenerCapacityExceeded {
                capacity: EngineConfig::MAX_LISTENERS,
            });
        }
        listener.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(listener);
        Ok(listener.sequence)
    }

    pub fn remove(&mut self, sequence: u32) -> Option<ResponseListener> {
        let index = self.entries.iter().position(|l| l.sequence == sequence)?;
        Some(self.entries.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResponseListener> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_match_everything() {
        let tag = TagId::new(5).unwrap();
        let hook = ResponseKind::Hook { condition: None };
        let any = ResponseListener::new(EffectPhase::Propose, ListenerScope::Target, hook);
        assert!(any.matches(EffectPhase::Propose, None, TemplateId(3)));
        assert!(!any.matches(EffectPhase::Apply, None, TemplateId(3)));

        let tagged = any.with_event_tag(tag).with_effect(TemplateId(3));
        assert!(tagged.matches(EffectPhase::Propose, Some(tag), TemplateId(3)));
        assert!(!tagged.matches(EffectPhase::Propose, None, TemplateId(3)));
        assert!(!tagged.matches(EffectPhase::Propose, Some(tag), TemplateId(4)));
    }

    #[test]
    fn push_assigns_sequence_and_caps() {
        let mut listeners = ResponseListeners::new();
        let hook = ResponseKind::PromptInput { prompt: 1 };
        for expected in 0..EngineConfig::MAX_LISTENERS as u32 {
            let listener = ResponseListener::new(EffectPhase::Propose, ListenerScope::Target, hook);
            assert_eq!(listeners.push(listener), Ok(expected));
        }
        let extra = ResponseListener::new(EffectPhase::Propose, ListenerScope::Target, hook);
        assert!(listeners.push(extra).is_err());

        assert!(listeners.remove(3).is_some());
        assert_eq!(listeners.push(extra), Ok(EngineConfig::MAX_LISTENERS as u32));
    }
}
