//! Frame pipeline driver.
//!
//! [`EffectEngine`] owns all runtime state (request queue, active instances,
//! budgets, telemetry, tag-operation scratch) and borrows the load-time
//! [`Registries`]. Every mutation of attributes, tags, and instances flows
//! through [`EffectEngine::run_frame`] or the explicit removal calls.
//!
//! One frame:
//! 1. reset the frame budgets and telemetry;
//! 2. tick active instances (Period, then Expire and Remove);
//! 3. drain the request queue breadth-first, bounded by the per-frame request
//!    cap; children emitted while processing join the back of the queue;
//! 4. report what happened, including a digest of the active-effect state.

mod context;
mod digest;
mod dispatch;
mod lifecycle;
mod natives;
mod report;

pub use context::{ModifierValues, PhaseContext};
pub use digest::FrameDigest;
pub use dispatch::run_phase;
pub use natives::{NativeHandler, NativeHandlerRegistry};
pub use report::{FrameReport, Resolution, ResolutionOutcome, SpawnIntent, SpawnKind};

use crate::budget::{DropReason, GasBudget, RootBudgetTable, RootId};
use crate::config::EngineConfig;
use crate::effect::{
    ActiveEffects, EffectInstance, EffectRequest, InstanceId, PushOutcome, RequestQueue,
};
use crate::env::{EngineEnv, EntityHandle, EntityStore};
use crate::error::EngineError;
use crate::registry::Registries;
use crate::response::ResponseTelemetry;
use crate::tag::TagOps;
use crate::targeting::ResolvedTargets;

/// Deterministic effect pipeline over one set of registries.
#[derive(Debug)]
pub struct EffectEngine<'r> {
    registries: &'r Registries,
    config: EngineConfig,
    tags: TagOps<'r>,
    queue: RequestQueue,
    active: ActiveEffects,
    gas: GasBudget,
    roots: RootBudgetTable,
    telemetry: ResponseTelemetry,
    resolved: ResolvedTargets,
    next_root: u64,
    next_instance: u64,
    frame: u64,
}

impl<'r> EffectEngine<'r> {
    pub fn new(registries: &'r Registries, config: EngineConfig) -> Self {
        Self {
            registries,
            config,
            tags: TagOps::new(&registries.tags),
            queue: RequestQueue::new(),
            active: ActiveEffects::new(),
            gas: GasBudget::new(config),
            roots: RootBudgetTable::new(),
            telemetry: ResponseTelemetry::new(),
            resolved: ResolvedTargets::default(),
            next_root: 1,
            next_instance: 1,
            frame: 0,
        }
    }

    pub fn registries(&self) -> &'r Registries {
        self.registries
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Queues a top-level request under a fresh root id.
    ///
    /// Returns `None` when the queue dropped it; the drop is counted in the
    /// next frame's budget summary.
    pub fn submit(&mut self, request: EffectRequest) -> Option<RootId> {
        let root = RootId(self.next_root);
        self.next_root += 1;
        self.enqueue(EffectRequest {
            root,
            depth: 0,
            ..request
        })
        .then_some(root)
    }

    /// Queues a request under the untracked root, which no per-root cap limits.
    pub fn submit_untracked(&mut self, request: EffectRequest) -> bool {
        self.enqueue(EffectRequest {
            root: RootId::UNTRACKED,
            depth: 0,
            ..request
        })
    }

    fn enqueue(&mut self, request: EffectRequest) -> bool {
        match self.queue.push(request) {
            PushOutcome::Queued | PushOutcome::Overflowed => true,
            PushOutcome::Dropped => {
                tracing::warn!(
                    root = %request.root,
                    template = %request.template,
                    "request queue full; request dropped"
                );
                false
            }
        }
    }

    /// Runs one frame against `world`.
    ///
    /// # Errors
    ///
    /// Returns an error when a tag invariant breaks or a collaborator the
    /// content needs (clock, spatial backend, graph host) is missing. Budget
    /// exhaustion is never an error; see [`FrameReport::budget`].
    pub fn run_frame(
        &mut self,
        world: &mut dyn EntityStore,
        env: &EngineEnv<'_>,
    ) -> Result<FrameReport, EngineError> {
        self.frame += 1;
        self.gas.reset(self.frame);
        self.roots.advance_frame();
        self.telemetry.clear();
        let env = *env;
        let mut report = FrameReport::new(self.frame);

        for _ in 0..self.queue.take_dropped() {
            self.gas.note_dropped(DropReason::Queue);
        }

        self.tick_instances(world, env, &mut report)?;

        while !self.queue.is_empty() && self.gas.try_process_request() {
            let Some(request) = self.queue.pop() else {
                break;
            };
            self.process_request(request, world, env, &mut report)?;
        }
        // In-frame drops were counted where the push failed.
        self.queue.take_dropped();

        report.carried_over = self.queue.len() as u32;
        report.active = self.active.len() as u32;
        report.budget = self.gas.summary();
        report.digest = FrameDigest::compute(self.frame, &self.active);

        tracing::debug!(
            frame = self.frame,
            processed = report.processed,
            cancelled = report.cancelled,
            expired = report.expired,
            carried_over = report.carried_over,
            active = report.active,
            fused = report.budget.fused,
            "frame complete"
        );
        Ok(report)
    }

    /// Removes one instance: runs its Remove phase and revokes every tag
    /// stack it granted. Returns false if no such instance is active.
    pub fn remove_instance(
        &mut self,
        id: InstanceId,
        world: &mut dyn EntityStore,
        env: &EngineEnv<'_>,
    ) -> Result<bool, EngineError> {
        if self.active.get(id).is_none() {
            return Ok(false);
        }
        let mut report = FrameReport::new(self.frame);
        self.retire(id, false, world, *env, &mut report)?;
        Ok(true)
    }

    /// Removes every instance on `target`. Returns how many were removed.
    pub fn remove_effects_on(
        &mut self,
        target: EntityHandle,
        world: &mut dyn EntityStore,
        env: &EngineEnv<'_>,
    ) -> Result<u32, EngineError> {
        let mut removed = 0;
        for id in self.active.ids() {
            if self.active.get(id).is_some_and(|instance| instance.target == target) {
                self.remove_instance(id, world, env)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn active(&self) -> &ActiveEffects {
        &self.active
    }

    pub fn instance(&self, id: InstanceId) -> Option<&EffectInstance> {
        self.active.get(id)
    }

    /// Instances currently on `target`, in creation order.
    pub fn instances_on(&self, target: EntityHandle) -> impl Iterator<Item = &EffectInstance> {
        self.active.iter().filter(move |instance| instance.target == target)
    }

    /// Requests waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn telemetry(&self) -> &ResponseTelemetry {
        &self.telemetry
    }

    /// Child creations charged to `root` this frame.
    pub fn root_usage(&self, root: RootId) -> u32 {
        self.roots.used(root)
    }

    pub fn digest(&self) -> FrameDigest {
        FrameDigest::compute(self.frame, &self.active)
    }
}
