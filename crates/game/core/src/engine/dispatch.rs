//! Pre → Main → Post dispatch of one phase.

use super::PhaseContext;
use crate::effect::{EffectPhase, PhaseHandler, PhaseSlot};
use crate::env::{GraphInput, GraphOutput};
use crate::error::EngineError;

/// Runs every handler bound to `ctx.phase`.
///
/// Main is the preset's built-in unless the template sets `skip_main`, in
/// which case the template's own Main (if any) runs instead. Phases the preset
/// does not activate only run the template's Pre/Post handlers. Once the
/// proposal is cancelled the remaining slots are skipped.
pub fn run_phase(ctx: &mut PhaseContext<'_, '_>) -> Result<(), EngineError> {
    let phase = ctx.phase;
    let template = ctx.template;
    let binding = *template.bindings.get(phase);

    let main = if binding.skip_main {
        binding.main
    } else {
        let active = ctx
            .registries
            .presets
            .get(template.preset)
            .is_some_and(|preset| preset.active_phases.has(phase));
        active
            .then(|| ctx.registries.behaviors.main(template.preset, phase))
            .flatten()
            .map(PhaseHandler::Native)
    };

    for (slot, handler) in [
        (PhaseSlot::Pre, binding.pre),
        (PhaseSlot::Main, main),
        (PhaseSlot::Post, binding.post),
    ] {
        let Some(handler) = handler else {
            continue;
        };
        if ctx.is_cancelled() {
            tracing::trace!(template = %template.id, %phase, %slot, "proposal cancelled; slot skipped");
            break;
        }
        tracing::trace!(template = %template.id, %phase, %slot, ?handler, "dispatch");
        run_handler(ctx, handler).map_err(|source| EngineError::Handler {
            phase,
            slot,
            source: Box::new(source),
        })?;
    }
    Ok(())
}

fn run_handler(ctx: &mut PhaseContext<'_, '_>, handler: PhaseHandler) -> Result<(), EngineError> {
    match handler {
        PhaseHandler::Native(id) => {
            let native = ctx
                .registries
                .natives
                .get(id)
                .ok_or(EngineError::UnknownNativeHandler(id))?;
            native(ctx)
        }
        PhaseHandler::Graph(program) => {
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
                tracing::debug!(%error, template = %request.template, phase = %ctx.phase, "graph handler skipped");
                return Ok(());
            }
            absorb_output(ctx, output);
            Ok(())
        }
    }
}

/// Output values replace modifier magnitudes slot by slot; at Resolve the
/// entity list replaces the candidates.
fn absorb_output(ctx: &mut PhaseContext<'_, '_>, output: GraphOutput) {
    for (value, produced) in ctx.values.iter_mut().zip(output.values.iter()) {
        *value = *produced;
    }
    if ctx.phase == EffectPhase::Resolve && !output.entities.is_empty() {
        ctx.resolved.candidates.clear();
        ctx.resolved.candidates.extend(output.entities);
    }
    if output.cancel {
        ctx.proposal.cancel();
    }
}
