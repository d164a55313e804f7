use super::{EffectState, TemplateId, ValueAdjust};
use crate::budget::RootId;
use crate::env::EntityHandle;
use crate::tag::TagId;

/// Caller overrides applied on top of a template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ParamOverrides {
    /// Percentage applied to every modifier value.
    pub value_scale_percent: Option<u16>,
    pub duration_ticks: Option<u32>,
    pub period_ticks: Option<u32>,
}

impl ParamOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Request to run one effect template against a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectRequest {
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: Option<EntityHandle>,
    pub template: TemplateId,
    pub overrides: ParamOverrides,
    /// Shared by every request a top-level request causes.
    pub root: RootId,
    /// Cascade depth below the root request (root = 0).
    pub depth: u8,
}

impl EffectRequest {
    pub fn new(source: EntityHandle, target: EntityHandle, template: TemplateId) -> Self {
        Self {
            source,
            target,
            target_context: None,
            template,
            overrides: ParamOverrides::default(),
            root: RootId::UNTRACKED,
            depth: 0,
        }
    }

    pub fn with_context(mut self, context: EntityHandle) -> Self {
        self.target_context = Some(context);
        self
    }

    pub fn with_overrides(mut self, overrides: ParamOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_root(mut self, root: RootId) -> Self {
        self.root = root;
        self
    }

    /// Child request sharing this request's root, one level deeper.
    pub fn child(
        &self,
        source: EntityHandle,
        target: EntityHandle,
        target_context: Option<EntityHandle>,
        template: TemplateId,
    ) -> Self {
        Self {
            source,
            target,
            target_context,
            template,
            overrides: ParamOverrides::default(),
            root: self.root,
            depth: self.depth.saturating_add(1),
        }
    }
}

/// A request while it moves through Propose → Trigger → Calculate → Apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectProposal {
    pub request: EffectRequest,
    pub state: EffectState,
    /// Whether response listeners may see this proposal.
    pub participates: bool,
    pub cancelled: bool,
    pub adjust: ValueAdjust,
    pub event_tag: Option<TagId>,
}

impl EffectProposal {
    pub fn new(request: EffectRequest, participates: bool, event_tag: Option<TagId>) -> Self {
        Self {
            request,
            state: EffectState::Pending,
            participates,
            cancelled: false,
            adjust: ValueAdjust::IDENTITY,
            event_tag,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.state = EffectState::Cancelled;
    }

    /// Moves to `state` unless the proposal was cancelled.
    pub fn advance(&mut self, state: EffectState) {
        if !self.cancelled {
            self.state = state;
        }
    }
}
