use arrayvec::ArrayVec;

use super::FrameReport;
use crate::budget::BudgetScope;
use crate::config::EngineConfig;
use crate::effect::{
    EffectInstance, EffectPhase, EffectProposal, EffectTemplate, RequestQueue, ValueAdjust,
};
use crate::env::{EngineEnv, EntityStore};
use crate::error::EngineError;
use crate::registry::Registries;
use crate::response::{ResponseTelemetry, WindowOutcome, run_window};
use crate::targeting::ResolvedTargets;

/// Current magnitude of each template modifier, in modifier order.
pub type ModifierValues = ArrayVec<i64, { EngineConfig::MAX_MODIFIERS }>;

/// Everything a phase handler may read or mutate.
///
/// Built by the engine per request (or per instance tick) from disjoint
/// borrows of its own state; handlers never see the engine itself.
pub struct PhaseContext<'a, 'w> {
    pub phase: EffectPhase,
    pub registries: &'a Registries,
    pub template: &'a EffectTemplate,
    pub proposal: &'a mut EffectProposal,
    /// Stack count the phase runs at (1 for instant effects).
    pub stacks: u16,
    pub values: &'a mut ModifierValues,
    /// The duration instance being applied, ticked, or removed.
    pub instance: Option<&'a mut EffectInstance>,
    pub resolved: &'a mut ResolvedTargets,
    pub world: &'a mut (dyn EntityStore + 'w),
    pub env: EngineEnv<'a>,
    pub budget: BudgetScope<'a>,
    pub queue: &'a mut RequestQueue,
    pub telemetry: &'a mut ResponseTelemetry,
    pub report: &'a mut FrameReport,
}

impl PhaseContext<'_, '_> {
    pub fn is_cancelled(&self) -> bool {
        self.proposal.cancelled
    }

    /// Runs the response window for `phase` over the current proposal.
    pub fn open_window(&mut self, phase: EffectPhase) -> Result<WindowOutcome, EngineError> {
        run_window(
            phase,
            self.proposal,
            &*self.world,
            &self.env,
            &mut self.budget,
            self.queue,
            self.telemetry,
        )
    }

    /// Folds the proposal's accumulated adjustment into every modifier value
    /// and resets it, so the next window starts from identity.
    pub fn apply_adjust(&mut self) -> ValueAdjust {
        let adjust = std::mem::take(&mut self.proposal.adjust);
        if !adjust.is_identity() {
            for value in self.values.iter_mut() {
                *value = adjust.apply(*value);
            }
        }
        adjust
    }
}
