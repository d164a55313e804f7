//! Request processing and instance ticking.
//!
//! A request walks Propose → Calculate → Resolve → Hit → Apply, with response
//! windows at Propose and Apply. Duration effects then live as instances that
//! tick Period until they Expire and are Removed.

use super::context::ModifierValues;
use super::dispatch::run_phase;
use super::natives::revert_recorded;
use super::report::{Resolution, ResolutionOutcome};
use super::{EffectEngine, FrameReport, PhaseContext};
use crate::budget::{BudgetScope, DropReason, SkipReason};
use crate::clock::Tick;
use crate::effect::{
    DurationPolicy, EffectInstance, EffectPhase, EffectProposal, EffectRequest, EffectState,
    EffectTemplate, GrantedTag, InstanceId, LifetimeKind, OverflowPolicy, StackPolicy,
    TagFormula, TriggerContext,
};
use crate::env::{EngineEnv, EntityHandle, EntityStore, GraphInput, GraphOutput};
use crate::error::EngineError;
use crate::tag::{RemoveOutcome, TagId, TagOps};

/// Where a request's outcome lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Landing {
    Instant,
    /// A new duration instance.
    Fresh,
    /// An instance of the same template already on the target.
    Restack(StackPolicy),
}

impl EffectEngine<'_> {
    pub(super) fn process_request(
        &mut self,
        request: EffectRequest,
        world: &mut dyn EntityStore,
        env: EngineEnv<'_>,
        report: &mut FrameReport,
    ) -> Result<(), EngineError> {
        let registries = self.registries;
        let template = match registries.templates.get(request.template) {
            Some(template) if registries.presets.get(template.preset).is_some() => template,
            _ => {
                self.gas.note_skipped(SkipReason::MissingTemplate);
                report.skipped += 1;
                return Ok(());
            }
        };
        if !world.is_alive(request.source) || !world.is_alive(request.target) {
            self.gas.note_skipped(SkipReason::StaleEntity);
            report.skipped += 1;
            return Ok(());
        }
        report.processed += 1;

        let now = if template.is_instant() {
            Tick::ZERO
        } else {
            env.clock()?.now(template.lifetime.clock)
        };
        let scale = request
            .overrides
            .value_scale_percent
            .map_or(100, i64::from);
        let mut values = base_values(template, scale);

        let existing = match template.stack {
            Some(policy) if !template.is_instant() => self
                .active
                .find_stack_mut(template.id, request.target)
                .map(|instance| (instance.id, policy)),
            _ => None,
        };
        let landing = match (template.is_instant(), existing) {
            (true, _) => Landing::Instant,
            (false, Some((_, policy))) => Landing::Restack(policy),
            (false, None) => Landing::Fresh,
        };
        if landing == Landing::Fresh && self.active.is_full() {
            self.gas.note_dropped(DropReason::ActiveCapacity);
            return Ok(());
        }

        let mut fresh = (landing == Landing::Fresh)
            .then(|| new_instance(template, &request, now, scale));
        let instance = match existing {
            Some((id, _)) => self.active.get_mut(id),
            None => fresh.as_mut(),
        };
        let stacks = instance.as_deref().map_or(1, |instance| instance.stacks.max(1));

        let mut proposal = EffectProposal::new(request, template.response_chain, template.event_tag);
        let mut ctx = PhaseContext {
            phase: EffectPhase::Propose,
            registries,
            template,
            proposal: &mut proposal,
            stacks,
            values: &mut values,
            instance,
            resolved: &mut self.resolved,
            world,
            env,
            budget: BudgetScope::new(
                &mut self.gas,
                &mut self.roots,
                self.config.max_root_creations,
                self.config.max_root_depth,
            ),
            queue: &mut self.queue,
            telemetry: &mut self.telemetry,
            report: &mut *report,
        };
        let outcome = resolve_proposal(&mut ctx, &mut self.tags, landing, now)?;

        tracing::trace!(
            root = %request.root,
            template = %request.template,
            target = %request.target,
            %outcome,
            "request resolved"
        );
        report.record(Resolution {
            root: request.root,
            template: request.template,
            source: request.source,
            target: request.target,
            depth: request.depth,
            outcome,
        });

        if outcome == ResolutionOutcome::Created
            && let Some(mut instance) = fresh
        {
            instance.id = InstanceId(self.next_instance);
            self.next_instance += 1;
            instance.state = EffectState::Committed;
            if self.active.insert(instance).is_err() {
                self.gas.note_dropped(DropReason::ActiveCapacity);
            }
        }
        Ok(())
    }

    /// Runs due periods, then expiry, for every active instance.
    pub(super) fn tick_instances(
        &mut self,
        world: &mut dyn EntityStore,
        env: EngineEnv<'_>,
        report: &mut FrameReport,
    ) -> Result<(), EngineError> {
        if self.active.is_empty() {
            return Ok(());
        }
        let clock = env.clock()?;

        for id in self.active.ids() {
            let Some(instance) = self.active.get(id) else {
                continue;
            };
            if !world.is_alive(instance.target) {
                tracing::debug!(id = id.0, target = %instance.target, "instance target despawned");
                self.active.remove(id);
                report.removed += 1;
                continue;
            }
            let now = clock.now(instance.clock);
            self.run_periods(id, now, world, env, report)?;

            if self.should_expire(id, now, world) {
                self.retire(id, true, world, env, report)?;
                report.expired += 1;
            }
        }
        Ok(())
    }

    fn run_periods(
        &mut self,
        id: InstanceId,
        now: Tick,
        world: &mut dyn EntityStore,
        env: EngineEnv<'_>,
        report: &mut FrameReport,
    ) -> Result<(), EngineError> {
        let registries = self.registries;
        let Some(instance) = self.active.get_mut(id) else {
            return Ok(());
        };
        let Some(template) = registries.templates.get(instance.template) else {
            return Ok(());
        };
        let (Some(mut next), period) = (instance.next_period, u64::from(instance.period_ticks))
        else {
            return Ok(());
        };
        if period == 0 {
            return Ok(());
        }

        let mut fired = 0;
        while next <= now && instance.expires_at.is_none_or(|expiry| next <= expiry) {
            if fired >= self.config.max_period_catch_up {
                let missed = (now.0 - next.0) / period + 1;
                next = next + missed * period;
                tracing::debug!(id = id.0, missed, "missed periods skipped");
                break;
            }
            fired += 1;
            next = next + period;

            let mut proposal = EffectProposal::new(
                instance_request(instance),
                template.response_chain,
                template.event_tag,
            );
            let mut values = base_values(template, instance.value_scale_percent);
            let stacks = instance.stacks;
            let mut ctx = PhaseContext {
                phase: EffectPhase::Period,
                registries,
                template,
                proposal: &mut proposal,
                stacks,
                values: &mut values,
                instance: Some(&mut *instance),
                resolved: &mut self.resolved,
                world: &mut *world,
                env,
                budget: BudgetScope::new(
                    &mut self.gas,
                    &mut self.roots,
                    self.config.max_root_creations,
                    self.config.max_root_depth,
                ),
                queue: &mut self.queue,
                telemetry: &mut self.telemetry,
                report: &mut *report,
            };
            ctx.open_window(EffectPhase::Period)?;
            if !ctx.is_cancelled() {
                ctx.apply_adjust();
                run_phase(&mut ctx)?;
            }
            report.periods += 1;
        }
        instance.next_period = Some(next);
        Ok(())
    }

    fn should_expire(&self, id: InstanceId, now: Tick, world: &dyn EntityStore) -> bool {
        let Some(instance) = self.active.get(id) else {
            return false;
        };
        if instance.is_expired(now) {
            return true;
        }
        instance
            .expire_condition
            .and_then(|condition| self.registries.expire_conditions.get(condition))
            .is_some_and(|condition| {
                condition.should_expire(&TriggerContext {
                    world,
                    source: instance.source,
                    target: instance.target,
                    stacks: instance.stacks,
                    now,
                })
            })
    }

    /// Runs Expire (when `expired`) and Remove, revokes granted tags, and
    /// drops the instance.
    pub(super) fn retire(
        &mut self,
        id: InstanceId,
        expired: bool,
        world: &mut dyn EntityStore,
        env: EngineEnv<'_>,
        report: &mut FrameReport,
    ) -> Result<(), EngineError> {
        let registries = self.registries;
        let Some(instance) = self.active.get_mut(id) else {
            return Ok(());
        };
        if let Some(template) = registries.templates.get(instance.template) {
            let mut proposal =
                EffectProposal::new(instance_request(instance), false, template.event_tag);
            let mut values = base_values(template, instance.value_scale_percent);
            let stacks = instance.stacks;
            let mut ctx = PhaseContext {
                phase: EffectPhase::Expire,
                registries,
                template,
                proposal: &mut proposal,
                stacks,
                values: &mut values,
                instance: Some(instance),
                resolved: &mut self.resolved,
                world,
                env,
                budget: BudgetScope::new(
                    &mut self.gas,
                    &mut self.roots,
                    self.config.max_root_creations,
                    self.config.max_root_depth,
                ),
                queue: &mut self.queue,
                telemetry: &mut self.telemetry,
                report,
            };
            if expired {
                run_phase(&mut ctx)?;
            }
            ctx.phase = EffectPhase::Remove;
            run_phase(&mut ctx)?;
            revoke_granted(&mut ctx, &mut self.tags);
        }
        self.active.remove(id);
        Ok(())
    }
}

fn resolve_proposal(
    ctx: &mut PhaseContext<'_, '_>,
    tags: &mut TagOps<'_>,
    landing: Landing,
    now: Tick,
) -> Result<ResolutionOutcome, EngineError> {
    enter(ctx, EffectPhase::Propose)?;
    ctx.open_window(EffectPhase::Propose)?;
    if ctx.is_cancelled() {
        return Ok(ResolutionOutcome::Cancelled);
    }

    ctx.proposal.advance(EffectState::Calculate);
    let calculated = ctx.apply_adjust();
    enter(ctx, EffectPhase::Calculate)?;

    ctx.resolved.clear();
    enter(ctx, EffectPhase::Resolve)?;
    enter(ctx, EffectPhase::Hit)?;
    if ctx.is_cancelled() {
        return Ok(ResolutionOutcome::Cancelled);
    }

    if let Landing::Restack(policy) = landing {
        let at_limit = ctx
            .instance
            .as_deref()
            .is_none_or(|instance| instance.stacks >= policy.limit);
        if at_limit && policy.overflow == OverflowPolicy::RejectNew {
            return Ok(ResolutionOutcome::Rejected);
        }
    }

    ctx.proposal.advance(EffectState::Apply);
    ctx.open_window(EffectPhase::Apply)?;
    if ctx.is_cancelled() {
        return Ok(ResolutionOutcome::Cancelled);
    }
    ctx.apply_adjust();

    let outcome = match landing {
        Landing::Instant => {
            enter(ctx, EffectPhase::Apply)?;
            if ctx.is_cancelled() {
                return Ok(ResolutionOutcome::Cancelled);
            }
            let template = ctx.template;
            let target = ctx.proposal.request.target;
            for granted in &template.granted_tags {
                let count = tag_count(ctx, granted)?;
                add_stacks(ctx, tags, target, granted.tag, count)?;
            }
            ResolutionOutcome::Applied
        }
        Landing::Fresh => {
            if let Some(instance) = ctx.instance.as_deref_mut() {
                instance.stacks = 1;
                instance.value_scale_percent =
                    instance.value_scale_percent.saturating_mul(calculated.scale_percent) / 100;
            }
            ctx.stacks = 1;
            enter(ctx, EffectPhase::Apply)?;
            if ctx.is_cancelled() {
                revert_recorded(ctx);
                return Ok(ResolutionOutcome::Cancelled);
            }
            regrant(ctx, tags)?;
            ResolutionOutcome::Created
        }
        Landing::Restack(policy) => {
            let Some(instance) = ctx.instance.as_deref_mut() else {
                return Ok(ResolutionOutcome::Rejected);
            };
            let grew = instance.stacks < policy.limit;
            if grew {
                instance.stacks += 1;
            }
            refresh_duration(instance, policy.duration, now);
            ctx.stacks = instance.stacks;
            if grew {
                enter(ctx, EffectPhase::Apply)?;
            }
            regrant(ctx, tags)?;
            if grew {
                ResolutionOutcome::Stacked
            } else {
                ResolutionOutcome::Refreshed
            }
        }
    };
    ctx.proposal.advance(EffectState::Committed);
    Ok(outcome)
}

fn enter(ctx: &mut PhaseContext<'_, '_>, phase: EffectPhase) -> Result<(), EngineError> {
    ctx.phase = phase;
    run_phase(ctx)
}

fn base_values(template: &EffectTemplate, scale_percent: i64) -> ModifierValues {
    template
        .modifiers
        .iter()
        .map(|modifier| i64::from(modifier.value).saturating_mul(scale_percent) / 100)
        .collect()
}

fn new_instance(
    template: &EffectTemplate,
    request: &EffectRequest,
    now: Tick,
    scale_percent: i64,
) -> EffectInstance {
    let lifetime = template.lifetime;
    let total_ticks = match lifetime.kind {
        LifetimeKind::AfterTicks => request
            .overrides
            .duration_ticks
            .unwrap_or(lifetime.duration_ticks),
        _ => 0,
    };
    let period_ticks = if lifetime.is_periodic() {
        request.overrides.period_ticks.unwrap_or(lifetime.period_ticks)
    } else {
        0
    };
    let expires_at = (lifetime.kind == LifetimeKind::AfterTicks)
        .then(|| now + u64::from(total_ticks));

    EffectInstance {
        id: InstanceId(0),
        template: template.id,
        root: request.root,
        source: request.source,
        target: request.target,
        target_context: request.target_context,
        clock: lifetime.clock,
        started_at: now,
        total_ticks,
        expires_at,
        period_ticks,
        next_period: (period_ticks > 0).then(|| now + u64::from(period_ticks)),
        expire_condition: template.expire_condition,
        state: EffectState::Apply,
        stacks: 0,
        value_scale_percent: scale_percent,
        applied: Default::default(),
        granted: Default::default(),
        depth: request.depth,
    }
}

/// The request an instance re-proposes when it ticks or leaves.
fn instance_request(instance: &EffectInstance) -> EffectRequest {
    EffectRequest {
        source: instance.source,
        target: instance.target,
        target_context: instance.target_context,
        template: instance.template,
        overrides: Default::default(),
        root: instance.root,
        depth: instance.depth,
    }
}

fn refresh_duration(instance: &mut EffectInstance, policy: DurationPolicy, now: Tick) {
    let Some(expiry) = instance.expires_at else {
        return;
    };
    let total = u64::from(instance.total_ticks);
    instance.expires_at = Some(match policy {
        DurationPolicy::Refresh => now + total,
        DurationPolicy::Add => expiry + total,
        DurationPolicy::Keep => expiry,
    });
}

/// Stack count a granted tag contributes at the context's stack count.
///
/// A graph formula whose program fails contributes nothing.
fn tag_count(ctx: &PhaseContext<'_, '_>, granted: &GrantedTag) -> Result<u16, EngineError> {
    if let Some(count) = granted.formula.evaluate(ctx.stacks) {
        return Ok(count);
    }
    let TagFormula::Graph(program) = granted.formula else {
        return Ok(0);
    };
    let graph = ctx.env.graph()?;
    let request = ctx.proposal.request;
    let input = GraphInput {
        phase: ctx.phase,
        template: request.template,
        source: request.source,
        target: request.target,
        target_context: request.target_context,
        stacks: ctx.stacks,
        values: ctx.values.as_slice(),
    };
    let mut output = GraphOutput::default();
    if let Err(error) = graph.run(program, &input, &mut output) {
        tracing::debug!(%error, tag = %granted.tag, "tag formula skipped");
        return Ok(0);
    }
    Ok(output
        .values
        .first()
        .map_or(0, |&value| u16::try_from(value.max(0)).unwrap_or(u16::MAX)))
}

/// Brings the instance's grants in line with its current stack count.
fn regrant(ctx: &mut PhaseContext<'_, '_>, tags: &mut TagOps<'_>) -> Result<(), EngineError> {
    let template = ctx.template;
    let target = ctx.proposal.request.target;
    for granted in &template.granted_tags {
        let desired = tag_count(ctx, granted)?;
        let Some(current) = ctx
            .instance
            .as_deref()
            .map(|instance| instance.granted_stacks(granted.tag))
        else {
            return Ok(());
        };
        let actual = if desired >= current {
            current + add_stacks(ctx, tags, target, granted.tag, desired - current)?
        } else {
            current - remove_stacks(ctx, tags, target, granted.tag, current - desired)
        };
        if let Some(instance) = ctx.instance.as_deref_mut() {
            instance.set_granted_stacks(granted.tag, actual);
        }
    }
    Ok(())
}

/// Removes every stack the instance granted.
fn revoke_granted(ctx: &mut PhaseContext<'_, '_>, tags: &mut TagOps<'_>) {
    let target = ctx.proposal.request.target;
    let Some(instance) = ctx.instance.as_deref_mut() else {
        return;
    };
    let granted = std::mem::take(&mut instance.granted);
    for entry in granted {
        remove_stacks(ctx, tags, target, entry.tag, entry.stacks);
    }
}

/// Adds up to `count` stacks; stops once rules keep the tag off.
fn add_stacks(
    ctx: &mut PhaseContext<'_, '_>,
    tags: &mut TagOps<'_>,
    target: EntityHandle,
    tag: TagId,
    count: u16,
) -> Result<u16, EngineError> {
    let Some(entity_tags) = ctx.world.tags_mut(target) else {
        return Ok(0);
    };
    let mut added = 0;
    for _ in 0..count {
        let outcome = tags.add_tag(entity_tags, tag, None)?;
        if tags.last_summary().fused {
            ctx.budget.gas.note_dropped(DropReason::TagTransaction);
        }
        if !outcome.is_present() {
            break;
        }
        added += 1;
    }
    Ok(added)
}

/// Removes up to `count` stacks; stops once the tag is gone.
fn remove_stacks(
    ctx: &mut PhaseContext<'_, '_>,
    tags: &mut TagOps<'_>,
    target: EntityHandle,
    tag: TagId,
    count: u16,
) -> u16 {
    let Some(entity_tags) = ctx.world.tags_mut(target) else {
        return 0;
    };
    let mut removed = 0;
    for _ in 0..count {
        match tags.remove_tag(entity_tags, tag, None) {
            RemoveOutcome::NotPresent => break,
            RemoveOutcome::Removed => {
                removed += 1;
                break;
            }
            RemoveOutcome::Decremented(_) => removed += 1,
        }
    }
    removed
}
