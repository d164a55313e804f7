use super::{
    ContextSlot, Facing, FilterDescriptor, QueryDescriptor, SlotBindings, TargetingDescriptor,
};
use crate::budget::{BudgetScope, DropReason};
use crate::config::EngineConfig;
use crate::effect::{EffectPhase, EffectRequest, PushOutcome, RequestQueue};
use crate::env::{
    CandidateList, EngineEnv, EntityHandle, EntityStore, GraphInput, GraphOutput, Position,
    SpatialRequest,
};
use crate::error::EngineError;

/// Candidates produced by Resolve, consumed by Hit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub candidates: CandidateList,
    pub center: Position,
    /// Inner radius of a ring query; candidates inside it are rejected at Hit.
    pub ring_inner: Option<i32>,
    /// Candidates the query produced beyond the buffer capacity.
    pub truncated: u32,
}

impl ResolvedTargets {
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.center = Position::ORIGIN;
        self.ring_inner = None;
        self.truncated = 0;
    }
}

/// Outcome counts of one Hit phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub considered: u32,
    pub filtered: u32,
    pub emitted: u32,
    pub dropped: u32,
}

impl FanOutReport {
    /// Adds another Hit phase's counts to this one.
    pub fn absorb(&mut self, other: FanOutReport) {
        self.considered += other.considered;
        self.filtered += other.filtered;
        self.emitted += other.emitted;
        self.dropped += other.dropped;
    }
}

fn slots(request: &EffectRequest) -> SlotBindings {
    SlotBindings {
        source: request.source,
        target: request.target,
        target_context: request.target_context,
        candidate: None,
    }
}

/// Runs the query for `request`, replacing the contents of `out`.
///
/// A missing spatial or graph backend is a configuration error. A graph
/// program that fails leaves the candidate list empty.
pub fn resolve_targets(
    query: &QueryDescriptor,
    request: &EffectRequest,
    world: &dyn EntityStore,
    env: &EngineEnv<'_>,
    out: &mut ResolvedTargets,
) -> Result<(), EngineError> {
    out.clear();
    match *query {
        QueryDescriptor::Spatial {
            shape,
            origin,
            max_candidates,
        } => {
            let spatial = env.spatial()?;
            let Some(center) = slots(request).get(origin).and_then(|e| world.position(e)) else {
                tracing::trace!(template = %request.template, ?origin, "query origin has no position");
                return Ok(());
            };
            let facing = match (world.position(request.source), world.position(request.target)) {
                (Some(from), Some(to)) if origin != ContextSlot::Source || from != to => {
                    Facing::between(from, to)
                }
                _ => Facing::default(),
            };
            let limit = match max_candidates {
                0 => EngineConfig::MAX_CANDIDATES,
                n => (n as usize).min(EngineConfig::MAX_CANDIDATES),
            };
            out.center = center;
            out.ring_inner = shape.inner_radius();
            spatial.query(
                &SpatialRequest {
                    center,
                    shape,
                    facing,
                    limit,
                },
                &mut out.candidates,
            );
        }
        QueryDescriptor::Graph { program } => {
            let graph = env.graph()?;
            out.center = world.position(request.target).unwrap_or(Position::ORIGIN);
            let input = GraphInput {
                phase: EffectPhase::Resolve,
                template: request.template,
                source: request.source,
                target: request.target,
                target_context: request.target_context,
                stacks: 1,
                values: &[],
            };
            let mut output = GraphOutput::default();
            if let Err(error) = graph.run(program, &input, &mut output) {
                tracing::debug!(%error, template = %request.template, "target query skipped");
                return Ok(());
            }
            for entity in output.entities {
                if out.candidates.try_push(entity).is_err() {
                    out.truncated += 1;
                }
            }
        }
    }
    Ok(())
}

/// Filters candidates and queues one child request per survivor.
///
/// Candidates are visited in resolve order. The target cap is checked before
/// any budget is consumed. After the first budget refusal no further budget
/// is consulted; every remaining eligible candidate, up to the target cap,
/// counts as dropped.
pub fn dispatch_hits(
    targeting: &TargetingDescriptor,
    request: &EffectRequest,
    resolved: &ResolvedTargets,
    world: &dyn EntityStore,
    budget: &mut BudgetScope<'_>,
    queue: &mut RequestQueue,
) -> FanOutReport {
    let mut report = FanOutReport::default();
    let Some(dispatch) = targeting.dispatch else {
        return report;
    };
    let filter = targeting.filter.unwrap_or_default();
    let mut bindings = slots(request);
    let mut refused = 0u32;

    for &candidate in &resolved.candidates {
        if filter.is_saturated((report.emitted + refused) as usize) {
            break;
        }
        report.considered += 1;
        if !accepts(&filter, world, request, candidate, resolved) {
            report.filtered += 1;
            continue;
        }
        bindings.candidate = Some(candidate);
        let Some((source, target, context)) = dispatch.bind(&bindings) else {
            report.filtered += 1;
            continue;
        };
        let child = request.child(source, target, context, dispatch.child_template);
        // Budgets only shrink within a frame, so one refusal stands for the rest.
        if refused > 0 || !budget.try_create_child(child.root, child.depth) {
            refused += 1;
            report.dropped += 1;
            continue;
        }
        match queue.push(child) {
            PushOutcome::Dropped => {
                budget.gas.note_dropped(DropReason::Queue);
                report.dropped += 1;
            }
            PushOutcome::Queued | PushOutcome::Overflowed => report.emitted += 1,
        }
    }

    tracing::trace!(
        template = %request.template,
        considered = report.considered,
        filtered = report.filtered,
        emitted = report.emitted,
        dropped = report.dropped,
        "fan-out"
    );
    report
}

fn accepts(
    filter: &FilterDescriptor,
    world: &dyn EntityStore,
    request: &EffectRequest,
    candidate: EntityHandle,
    resolved: &ResolvedTargets,
) -> bool {
    filter.accepts(world, request.source, candidate, resolved.center, resolved.ring_inner)
}
