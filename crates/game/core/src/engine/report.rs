use arrayvec::ArrayVec;

use crate::budget::{BudgetSummary, RootId};
use crate::config::EngineConfig;
use crate::effect::TemplateId;
use crate::env::{EntityHandle, Position};
use crate::targeting::FanOutReport;

use super::FrameDigest;

/// What a spawning preset asks the host to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum SpawnKind {
    Projectile,
    Unit,
}

/// Entity creation the host performs after the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnIntent {
    pub kind: SpawnKind,
    pub archetype: u32,
    pub count: u8,
    pub source: EntityHandle,
    pub target: EntityHandle,
    /// Target position when the request was applied.
    pub position: Option<Position>,
    pub root: RootId,
    pub template: TemplateId,
}

/// How one request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Instant effect committed.
    Applied,
    /// New duration instance committed.
    Created,
    /// Existing instance gained a stack.
    Stacked,
    /// Existing instance at its limit replaced its oldest stack.
    Refreshed,
    /// Existing instance at its limit refused the application.
    Rejected,
    Cancelled,
}

/// One processed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    pub root: RootId,
    pub template: TemplateId,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub depth: u8,
    pub outcome: ResolutionOutcome,
}

/// Everything one [`super::EffectEngine::run_frame`] call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Requests that passed the template and liveness checks.
    pub processed: u32,
    pub applied: u32,
    pub created: u32,
    pub stacked: u32,
    pub refreshed: u32,
    pub rejected: u32,
    pub cancelled: u32,
    /// Period phases run across all instances.
    pub periods: u32,
    pub expired: u32,
    /// Instances removed because their target died or by an explicit removal.
    pub removed: u32,
    /// Requests skipped for a missing template or stale entity.
    pub skipped: u32,
    pub fan_out: FanOutReport,
    /// Requests left in the queue for the next frame.
    pub carried_over: u32,
    /// Active instances after the frame.
    pub active: u32,
    pub spawns: ArrayVec<SpawnIntent, { EngineConfig::MAX_SPAWN_INTENTS }>,
    /// Resolutions in processing order; later ones are counted but not kept once full.
    pub resolutions: ArrayVec<Resolution, { EngineConfig::MAX_FRAME_RESOLUTIONS }>,
    pub budget: BudgetSummary,
    pub digest: FrameDigest,
}

impl FrameReport {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    pub fn record(&mut self, resolution: Resolution) {
        let counter = match resolution.outcome {
            ResolutionOutcome::Applied => &mut self.applied,
            ResolutionOutcome::Created => &mut self.created,
            ResolutionOutcome::Stacked => &mut self.stacked,
            ResolutionOutcome::Refreshed => &mut self.refreshed,
            ResolutionOutcome::Rejected => &mut self.rejected,
            ResolutionOutcome::Cancelled => &mut self.cancelled,
        };
        *counter += 1;
        let _ = self.resolutions.try_push(resolution);
    }

    /// Resolutions of one root, in processing order.
    pub fn resolutions_of(&self, root: RootId) -> impl Iterator<Item = &Resolution> {
        self.resolutions.iter().filter(move |r| r.root == root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_every_outcome() {
        let e = EntityHandle::from_parts(0, 0);
        let mut report = FrameReport::new(3);
        for (root, outcome) in [
            (1, ResolutionOutcome::Applied),
            (1, ResolutionOutcome::Cancelled),
            (2, ResolutionOutcome::Stacked),
        ] {
            report.record(Resolution {
                root: RootId(root),
                template: TemplateId(1),
                source: e,
                target: e,
                depth: 0,
                outcome,
            });
        }
        assert_eq!((report.applied, report.cancelled, report.stacked), (1, 1, 1));
        assert_eq!(report.resolutions_of(RootId(1)).count(), 2);
    }
}
