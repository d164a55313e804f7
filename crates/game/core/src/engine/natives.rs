//! Built-in native phase handlers and the registry that names them.

use std::collections::BTreeMap;
use std::fmt;

use super::{PhaseContext, SpawnIntent, SpawnKind};
use crate::budget::DropReason;
use crate::effect::{EffectPhase, ModifierOp, NativeHandlerId};
use crate::error::EngineError;
use crate::targeting::{dispatch_hits, resolve_targets};

/// A native phase handler.
pub type NativeHandler = fn(&mut PhaseContext<'_, '_>) -> Result<(), EngineError>;

/// Native handler id → function pointer, plus the string keys content uses.
#[derive(Clone)]
pub struct NativeHandlerRegistry {
    handlers: Vec<Option<NativeHandler>>,
    names: BTreeMap<String, NativeHandlerId>,
    next_custom: u16,
}

impl fmt::Debug for NativeHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandlerRegistry")
            .field("names", &self.names)
            .finish()
    }
}

impl Default for NativeHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            names: BTreeMap::new(),
            next_custom: NativeHandlerId::FIRST_CUSTOM,
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert(NativeHandlerId::APPLY_MODIFIERS, "apply_modifiers", apply_modifiers);
        registry.insert(NativeHandlerId::REVERT_MODIFIERS, "revert_modifiers", revert_modifiers);
        registry.insert(NativeHandlerId::RESOLVE_TARGETS, "resolve_targets", resolve);
        registry.insert(NativeHandlerId::DISPATCH_HITS, "dispatch_hits", dispatch);
        registry.insert(NativeHandlerId::FAN_OUT, "fan_out", fan_out);
        registry.insert(NativeHandlerId::LAUNCH_PROJECTILE, "launch_projectile", launch_projectile);
        registry.insert(NativeHandlerId::CREATE_UNIT, "create_unit", create_unit);
        registry
    }

    fn insert(&mut self, id: NativeHandlerId, name: &str, handler: NativeHandler) {
        let index = id.0 as usize;
        if self.handlers.len() <= index {
            self.handlers.resize(index + 1, None);
        }
        self.handlers[index] = Some(handler);
        self.names.insert(name.to_owned(), id);
    }

    /// Registers a handler under a string key and returns its id.
    ///
    /// Re-registering a key replaces the handler but keeps the id.
    pub fn register(&mut self, name: &str, handler: NativeHandler) -> NativeHandlerId {
        if let Some(&id) = self.names.get(name) {
            tracing::warn!(name, %id, "native handler re-registered");
            self.insert(id, name, handler);
            return id;
        }
        let id = NativeHandlerId(self.next_custom);
        self.next_custom = self.next_custom.saturating_add(1);
        self.insert(id, name, handler);
        id
    }

    pub fn get(&self, id: NativeHandlerId) -> Option<NativeHandler> {
        self.handlers.get(id.0 as usize).copied().flatten()
    }

    pub fn find(&self, name: &str) -> Option<NativeHandlerId> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, id: NativeHandlerId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Applies every modifier to the target and records the deltas on the instance.
///
/// During Period, additive magnitudes scale with the stack count.
fn apply_modifiers(ctx: &mut PhaseContext<'_, '_>) -> Result<(), EngineError> {
    let target = ctx.proposal.request.target;
    let stacks = if ctx.phase == EffectPhase::Period {
        i64::from(ctx.stacks.max(1))
    } else {
        1
    };

    for (index, (modifier, &value)) in ctx
        .template
        .modifiers
        .iter()
        .zip(ctx.values.iter())
        .enumerate()
    {
        let value = match modifier.op {
            ModifierOp::Add => value.saturating_mul(stacks),
            ModifierOp::Multiply | ModifierOp::Override => value,
        };
        let current = ctx.world.attribute(target, modifier.attribute).unwrap_or(0);
        let next = modifier.op.combine(current, value);
        if !ctx.world.set_attribute(target, modifier.attribute, next) {
            continue;
        }
        if let Some(instance) = ctx.instance.as_deref_mut() {
            instance.record_delta(index, modifier.attribute, next.saturating_sub(current));
        }
    }
    Ok(())
}

fn revert_modifiers(ctx: &mut PhaseContext<'_, '_>) -> Result<(), EngineError> {
    revert_recorded(ctx);
    Ok(())
}

/// Subtracts every delta the instance recorded and forgets them.
pub(super) fn revert_recorded(ctx: &mut PhaseContext<'_, '_>) {
    let target = ctx.proposal.request.target;
    let Some(instance) = ctx.instance.as_deref_mut() else {
        return;
    };
    for applied in instance.applied.drain(..) {
        if let Some(current) = ctx.world.attribute(target, applied.attribute) {
            ctx.world
                .set_attribute(target, applied.attribute, current.saturating_sub(applied.delta));
        }
    }
}

fn resolve(ctx: &mut PhaseContext<'_, '_>) -> Result<(), EngineError> {
    let Some(query) = ctx.template.targeting.query else {
        ctx.resolved.clear();
        return Ok(());
    };
    resolve_targets(&query, &ctx.proposal.request, &*ctx.world, &ctx.env, ctx.resolved)?;
    if ctx.resolved.truncated > 0 {
        ctx.budget.gas.note_dropped(DropReason::FanOut);
        ctx.report.fan_out.dropped += ctx.resolved.truncated;
    }
    Ok(())
}

fn dispatch(ctx: &mut PhaseContext<'_, '_>) -> Result<(), EngineError> {
    let fan_out = dispatch_hits(
        &ctx.template.targeting,
        &ctx.proposal.request,
        ctx.resolved,
        &*ctx.world,
        &mut ctx.budget,
        ctx.queue,
    );
    ctx.report.fan_out.absorb(fan_out);
    Ok(())
}

fn fan_out(ctx: &mut PhaseContext<'_, '_>) -> Result<(), EngineError> {
    resolve(ctx)?;
    dispatch(ctx)
}

fn launch_projectile(ctx: &mut PhaseContext<'_, '_>) -> Result<(), EngineError> {
    push_spawn(ctx, SpawnKind::Projectile);
    Ok(())
}

fn create_unit(ctx: &mut PhaseContext<'_, '_>) -> Result<(), EngineError> {
    push_spawn(ctx, SpawnKind::Unit);
    Ok(())
}

fn push_spawn(ctx: &mut PhaseContext<'_, '_>, kind: SpawnKind) {
    let Some(spawn) = ctx.template.spawn else {
        return;
    };
    let request = ctx.proposal.request;
    let intent = SpawnIntent {
        kind,
        archetype: spawn.archetype,
        count: spawn.count,
        source: request.source,
        target: request.target,
        position: ctx.world.position(request.target),
        root: request.root,
        template: request.template,
    };
    if ctx.report.spawns.try_push(intent).is_err() {
        ctx.budget.gas.note_dropped(DropReason::Spawn);
    }
}
