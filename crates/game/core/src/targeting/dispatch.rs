use crate::effect::TemplateId;
use crate::env::EntityHandle;

/// Named entity slot a child request draws its participants from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContextSlot {
    Source,
    Target,
    TargetContext,
    /// The candidate being hit. In a response chain this is the listener owner.
    Candidate,
}

/// Entities currently bound to each [`ContextSlot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotBindings {
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: Option<EntityHandle>,
    pub candidate: Option<EntityHandle>,
}

impl SlotBindings {
    pub fn get(&self, slot: ContextSlot) -> Option<EntityHandle> {
        match slot {
            ContextSlot::Source => Some(self.source),
            ContextSlot::Target => Some(self.target),
            ContextSlot::TargetContext => self.target_context,
            ContextSlot::Candidate => self.candidate,
        }
    }
}

/// How each hit candidate becomes a child request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DispatchDescriptor {
    pub child_template: TemplateId,
    pub source: ContextSlot,
    pub target: ContextSlot,
    pub context: Option<ContextSlot>,
}

impl DispatchDescriptor {
    /// Source keeps attacking; each candidate is a target; the parent target is the context.
    pub fn aoe(child_template: TemplateId) -> Self {
        Self {
            child_template,
            source: ContextSlot::Source,
            target: ContextSlot::Candidate,
            context: Some(ContextSlot::Target),
        }
    }

    /// The parent target strikes back at the parent source.
    pub fn reflect(child_template: TemplateId) -> Self {
        Self {
            child_template,
            source: ContextSlot::Target,
            target: ContextSlot::Source,
            context: None,
        }
    }

    /// The parent target passes the effect on to each candidate.
    pub fn redirect(child_template: TemplateId) -> Self {
        Self {
            child_template,
            source: ContextSlot::Target,
            target: ContextSlot::Candidate,
            context: Some(ContextSlot::Source),
        }
    }

    /// Resolves `(source, target, context)` for one child, or `None` if a slot is unbound.
    pub fn bind(
        &self,
        slots: &SlotBindings,
    ) -> Option<(EntityHandle, EntityHandle, Option<EntityHandle>)> {
        let source = slots.get(self.source)?;
        let target = slots.get(self.target)?;
        let context = match self.context {
            Some(slot) => Some(slots.get(slot)?),
            None => None,
        };
        Some((source, target, context))
    }
}
