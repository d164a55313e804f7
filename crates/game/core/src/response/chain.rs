use std::cmp::Reverse;

use arrayvec::ArrayVec;

use super::{
    ListenerScope, ModifyOp, ResponseAction, ResponseKind, ResponseListener, ResponseRecord,
    ResponseTelemetry, ResponseValue,
};
use crate::budget::{BudgetScope, DropReason};
use crate::config::EngineConfig;
use crate::effect::{EffectPhase, EffectProposal, EffectState, PushOutcome, RequestQueue};
use crate::env::{EngineEnv, EntityHandle, EntityStore, GraphInput, GraphOutput, ProgramId};
use crate::error::EngineError;
use crate::targeting::SlotBindings;

/// What happened to a response window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowOutcome {
    /// No listener matched, or the proposal does not participate.
    NotOpened,
    /// Window budget exhausted; the proposal proceeds unmodified.
    Dropped,
    Resolved { evaluated: u32 },
}

#[derive(Clone, Copy, Debug)]
struct Armed {
    owner: EntityHandle,
    listener: ResponseListener,
}

/// Opens a response window for `proposal` at `phase` and fires its listeners.
///
/// Listeners fire by descending priority; ties keep target listeners before
/// source listeners, each in insertion order. A Hook that cancels ends the
/// window. Step exhaustion ends it early, leaving the proposal as modified so far.
pub fn run_window(
    phase: EffectPhase,
    proposal: &mut EffectProposal,
    world: &dyn EntityStore,
    env: &EngineEnv<'_>,
    budget: &mut BudgetScope<'_>,
    queue: &mut RequestQueue,
    telemetry: &mut ResponseTelemetry,
) -> Result<WindowOutcome, EngineError> {
    if !proposal.participates || proposal.cancelled {
        return Ok(WindowOutcome::NotOpened);
    }
    let armed = collect(phase, proposal, world);
    if armed.is_empty() {
        return Ok(WindowOutcome::NotOpened);
    }
    if !budget.gas.try_open_window() {
        return Ok(WindowOutcome::Dropped);
    }
    proposal.advance(EffectState::Trigger);

    let frame = budget.gas.summary().frame;
    let request = proposal.request;
    let mut evaluated = 0;
    for Armed { owner, listener } in armed {
        if !budget.gas.try_step() {
            break;
        }
        evaluated += 1;

        let action = match listener.kind {
            ResponseKind::Hook { condition } => {
                let cancel = match condition {
                    None => Some(true),
                    Some(program) => run_graph(program, phase, proposal, env)?.map(|out| out.cancel),
                };
                match cancel {
                    Some(true) => {
                        proposal.cancel();
                        ResponseAction::Cancelled
                    }
                    Some(false) => ResponseAction::Passed,
                    None => ResponseAction::Skipped,
                }
            }
            ResponseKind::Modify { op, value } => {
                let value = match value {
                    ResponseValue::Static(value) => Some(value),
                    ResponseValue::Graph(program) => run_graph(program, phase, proposal, env)?
                        .and_then(|out| out.values.first().copied()),
                };
                match value {
                    Some(value) => {
                        let adjust = &mut proposal.adjust;
                        match op {
                            ModifyOp::Add => adjust.add = adjust.add.saturating_add(value),
                            ModifyOp::Scale => {
                                adjust.scale_percent = adjust.scale_percent.saturating_mul(value) / 100
                            }
                            ModifyOp::Override => adjust.override_value = Some(value),
                        }
                        ResponseAction::Modified
                    }
                    None => ResponseAction::Skipped,
                }
            }
            ResponseKind::Chain { template, target } => {
                let slots = SlotBindings {
                    source: request.source,
                    target: request.target,
                    target_context: request.target_context,
                    candidate: Some(owner),
                };
                match slots.get(target) {
                    Some(target) => {
                        let child = request.child(owner, target, Some(request.target), template);
                        if !budget.try_create_child(child.root, child.depth) {
                            ResponseAction::ChainDropped
                        } else if queue.push(child) == PushOutcome::Dropped {
                            budget.gas.note_dropped(DropReason::Queue);
                            ResponseAction::ChainDropped
                        } else {
                            budget.gas.note_response_created();
                            ResponseAction::Chained
                        }
                    }
                    None => ResponseAction::ChainDropped,
                }
            }
            ResponseKind::PromptInput { .. } => ResponseAction::Prompted,
        };

        telemetry.record(ResponseRecord {
            frame,
            root: request.root,
            template: request.template,
            phase,
            owner,
            scope: listener.scope,
            priority: listener.priority,
            action,
        });
        if proposal.cancelled {
            break;
        }
    }
    Ok(WindowOutcome::Resolved { evaluated })
}

fn collect(
    phase: EffectPhase,
    proposal: &EffectProposal,
    world: &dyn EntityStore,
) -> ArrayVec<Armed, { 2 * EngineConfig::MAX_LISTENERS }> {
    let request = &proposal.request;
    let mut armed = ArrayVec::new();
    for (owner, scope) in [
        (request.target, ListenerScope::Target),
        (request.source, ListenerScope::Source),
    ] {
        let Some(listeners) = world.listeners(owner) else {
            continue;
        };
        for listener in listeners.iter() {
            if listener.scope == scope
                && listener.matches(phase, proposal.event_tag, request.template)
            {
                armed.push(Armed {
                    owner,
                    listener: *listener,
                });
            }
        }
    }
    armed.sort_by_key(|a| Reverse(a.listener.priority));
    armed
}

/// `Ok(None)` when the program failed; failures are skipped.
fn run_graph(
    program: ProgramId,
    phase: EffectPhase,
    proposal: &EffectProposal,
    env: &EngineEnv<'_>,
) -> Result<Option<GraphOutput>, EngineError> {
    let graph = env.graph()?;
    let request = &proposal.request;
    let input = GraphInput {
        phase,
        template: request.template,
        source: request.source,
        target: request.target,
        target_context: request.target_context,
        stacks: 1,
        values: &[],
    };
    let mut output = GraphOutput::default();
    match graph.run(program, &input, &mut output) {
        Ok(()) => Ok(Some(output)),
        Err(error) => {
            tracing::debug!(%error, %phase, "response program skipped");
            Ok(None)
        }
    }
}
