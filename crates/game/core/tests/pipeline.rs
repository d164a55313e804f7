//! End-to-end lifecycle scenarios: instant hits, responses, stacking
//! duration effects, expiry and spawning.

mod common;

use common::{ARMOR, HEALTH, armor_buff, damage, dot, health, spawn, tag, tag_count};
use gameplay_core::response::ResponseAction;
use gameplay_core::{
    ClockDomain, Clocks, EffectEngine, EffectLifetime, EffectPhase, EffectRequest, EffectTemplate,
    EngineConfig, EngineEnv, EngineError, EntityStore, EnvError, GrantedTag, ListenerScope,
    MemoryWorld, ModifyOp, PresetId, Registries, ResolutionOutcome, ResponseKind,
    ResponseListener, ResponseValue, SpawnKind, TagOps, TemplateId, Tick,
};
use gameplay_core::effect::{SpawnDescriptor, TriggerParams};

#[test]
fn instant_damage_applies_once() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    let root = engine.submit(EffectRequest::new(a, b, TemplateId(1))).unwrap();
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(health(&world, b), 90);
    assert_eq!(health(&world, a), 100);
    assert_eq!(report.processed, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(report.resolutions[0].root, root);
    assert_eq!(report.resolutions[0].outcome, ResolutionOutcome::Applied);
    assert!(engine.active().is_empty());
    assert_eq!(engine.pending(), 0);
}

#[test]
fn hook_at_propose_cancels_before_anything_lands() {
    let mut registries = Registries::with_builtins();
    registries
        .register_template(damage(1, 10).with_granted_tag(GrantedTag::fixed(tag(5), 1)))
        .unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    world
        .listeners_mut(b)
        .unwrap()
        .push(ResponseListener::new(
            EffectPhase::Propose,
            ListenerScope::Target,
            ResponseKind::Hook { condition: None },
        ))
        .unwrap();

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    engine.submit(EffectRequest::new(a, b, TemplateId(1)));
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(report.cancelled, 1);
    assert_eq!(report.applied, 0);
    assert_eq!(health(&world, b), 100);
    assert_eq!(tag_count(&world, b, 5), 0);

    let records: Vec<_> = engine.telemetry().iter().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].owner, b);
    assert_eq!(records[0].action, ResponseAction::Cancelled);
}

#[test]
fn tagged_hook_cancels_only_matching_events() {
    let mut registries = Registries::with_builtins();
    registries
        .register_template(
            damage(1, 10)
                .with_event_tag(tag(7))
                .with_granted_tag(GrantedTag::fixed(tag(5), 1)),
        )
        .unwrap();
    registries
        .register_template(
            damage(2, 10)
                .with_event_tag(tag(8))
                .with_granted_tag(GrantedTag::fixed(tag(5), 1)),
        )
        .unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    world
        .listeners_mut(b)
        .unwrap()
        .push(
            ResponseListener::new(
                EffectPhase::Propose,
                ListenerScope::Target,
                ResponseKind::Hook { condition: None },
            )
            .with_event_tag(tag(7))
            .with_priority(100),
        )
        .unwrap();

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    engine.submit(EffectRequest::new(a, b, TemplateId(1)));
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(report.cancelled, 1);
    assert_eq!(report.resolutions[0].outcome, ResolutionOutcome::Cancelled);
    assert_eq!(health(&world, b), 100);
    assert_eq!(tag_count(&world, b, 5), 0);

    engine.submit(EffectRequest::new(a, b, TemplateId(2)));
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!((report.cancelled, report.applied), (0, 1));
    assert_eq!(health(&world, b), 90);
    assert_eq!(tag_count(&world, b, 5), 1);
}

#[test]
fn listener_for_another_template_stays_silent() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    world
        .listeners_mut(b)
        .unwrap()
        .push(
            ResponseListener::new(
                EffectPhase::Propose,
                ListenerScope::Target,
                ResponseKind::Hook { condition: None },
            )
            .with_effect(TemplateId(99)),
        )
        .unwrap();

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    engine.submit(EffectRequest::new(a, b, TemplateId(1)));
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(health(&world, b), 90);
    assert!(engine.telemetry().is_empty());
    assert_eq!(report.budget.counters.windows_opened, 0);
}

#[test]
fn modify_response_scales_the_hit() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    world
        .listeners_mut(b)
        .unwrap()
        .push(ResponseListener::new(
            EffectPhase::Propose,
            ListenerScope::Target,
            ResponseKind::Modify {
                op: ModifyOp::Scale,
                value: ResponseValue::Static(50),
            },
        ))
        .unwrap();

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    engine.submit(EffectRequest::new(a, b, TemplateId(1)));
    engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(health(&world, b), 95);
}

#[test]
fn stacking_dot_caps_then_refreshes() {
    let mut registries = Registries::with_builtins();
    registries.register_template(dot(2, 2, 3)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let mut clocks = Clocks::new();
    let mut engine = EffectEngine::new(&registries, EngineConfig::default());

    for _ in 0..3 {
        engine.submit(EffectRequest::new(a, b, TemplateId(2))).unwrap();
    }
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();
    assert_eq!((report.created, report.stacked), (1, 2));
    assert_eq!(report.active, 1);
    assert_eq!(health(&world, b), 100);

    clocks.advance_by(ClockDomain::FixedFrame, 2);
    engine.submit(EffectRequest::new(a, b, TemplateId(2))).unwrap();
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();

    // Two periods at three stacks, then the fourth application only refreshes.
    assert_eq!(report.periods, 2);
    assert_eq!(health(&world, b), 100 - 2 * 2 * 3);
    assert_eq!(report.refreshed, 1);

    let instance = engine.instances_on(b).next().unwrap();
    assert_eq!(instance.stacks, 3);
    assert_eq!(instance.remaining_ticks(Tick(2)), Some(3));
}

#[test]
fn dot_runs_its_periods_then_expires() {
    let mut registries = Registries::with_builtins();
    registries.register_template(dot(2, 2, 3)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let mut clocks = Clocks::new();
    let mut engine = EffectEngine::new(&registries, EngineConfig::default());

    engine.submit(EffectRequest::new(a, b, TemplateId(2))).unwrap();
    engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();

    clocks.advance_by(ClockDomain::FixedFrame, 3);
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();

    assert_eq!(report.periods, 3);
    assert_eq!(report.expired, 1);
    assert_eq!(health(&world, b), 94);
    assert!(engine.active().is_empty());
}

#[test]
fn period_catch_up_cap_skips_missed_ticks() {
    let mut registries = Registries::with_builtins();
    registries.register_template(dot(2, 2, 3)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let mut clocks = Clocks::new();
    let config = EngineConfig::default().with_period_catch_up(1);
    let mut engine = EffectEngine::new(&registries, config);

    engine.submit(EffectRequest::new(a, b, TemplateId(2))).unwrap();
    engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();

    clocks.advance_by(ClockDomain::FixedFrame, 3);
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();

    assert_eq!(report.periods, 1);
    assert_eq!(health(&world, b), 98);
}

#[test]
fn buff_reverts_and_revokes_on_expiry() {
    let mut registries = Registries::with_builtins();
    registries.register_template(armor_buff(3, 5, 7, 2)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let mut clocks = Clocks::new();
    let mut engine = EffectEngine::new(&registries, EngineConfig::default());

    for _ in 0..3 {
        engine.submit(EffectRequest::new(a, b, TemplateId(3))).unwrap();
    }
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();

    // Limit two with RejectNew: the third application bounces.
    assert_eq!((report.created, report.stacked, report.rejected), (1, 1, 1));
    assert_eq!(world.attribute(b, ARMOR), Some(10));
    assert_eq!(tag_count(&world, b, 7), 2);

    // Add policy pushed expiry from tick 2 to tick 4.
    clocks.advance_by(ClockDomain::FixedFrame, 2);
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();
    assert_eq!(report.expired, 0);

    clocks.advance_by(ClockDomain::FixedFrame, 2);
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_clock(&clocks))
        .unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(world.attribute(b, ARMOR), Some(0));
    assert_eq!(tag_count(&world, b, 7), 0);
    assert!(engine.active().is_empty());
}

#[test]
fn explicit_removal_runs_remove_phase() {
    let mut registries = Registries::with_builtins();
    registries.register_template(armor_buff(3, 5, 7, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let clocks = Clocks::new();
    let env = EngineEnv::empty().with_clock(&clocks);
    let mut engine = EffectEngine::new(&registries, EngineConfig::default());

    engine.submit(EffectRequest::new(a, b, TemplateId(3))).unwrap();
    engine.run_frame(&mut world, &env).unwrap();
    assert_eq!(world.attribute(b, ARMOR), Some(5));

    let id = engine.instances_on(b).next().unwrap().id;
    assert!(engine.remove_instance(id, &mut world, &env).unwrap());
    assert!(!engine.remove_instance(id, &mut world, &env).unwrap());

    assert_eq!(world.attribute(b, ARMOR), Some(0));
    assert_eq!(tag_count(&world, b, 7), 0);
    assert!(engine.instance(id).is_none());
}

#[test]
fn expire_condition_ends_an_infinite_buff() {
    let mut registries = Registries::with_builtins();
    let condition = registries
        .instantiate_trigger(
            "target_lacks_tag",
            &TriggerParams {
                tag: Some(tag(9)),
                ..TriggerParams::default()
            },
        )
        .unwrap();
    registries
        .register_template(
            EffectTemplate::new(
                TemplateId(4),
                PresetId::BUFF,
                EffectLifetime::infinite(ClockDomain::FixedFrame),
            )
            .with_expire_condition(condition),
        )
        .unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let mut ops = TagOps::new(&registries.tags);
    ops.add_tag(world.tags_mut(b).unwrap(), tag(9), None).unwrap();

    let clocks = Clocks::new();
    let env = EngineEnv::empty().with_clock(&clocks);
    let mut engine = EffectEngine::new(&registries, EngineConfig::default());

    engine.submit(EffectRequest::new(a, b, TemplateId(4))).unwrap();
    engine.run_frame(&mut world, &env).unwrap();
    let report = engine.run_frame(&mut world, &env).unwrap();
    assert_eq!(report.expired, 0);
    assert_eq!(engine.active().len(), 1);

    ops.remove_tag(world.tags_mut(b).unwrap(), tag(9), None);
    let report = engine.run_frame(&mut world, &env).unwrap();
    assert_eq!(report.expired, 1);
    assert!(engine.active().is_empty());
}

#[test]
fn despawned_target_drops_its_instances() {
    let mut registries = Registries::with_builtins();
    registries.register_template(dot(2, 2, 3)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let clocks = Clocks::new();
    let env = EngineEnv::empty().with_clock(&clocks);
    let mut engine = EffectEngine::new(&registries, EngineConfig::default());

    engine.submit(EffectRequest::new(a, b, TemplateId(2))).unwrap();
    engine.run_frame(&mut world, &env).unwrap();
    world.despawn(b);

    let report = engine.run_frame(&mut world, &env).unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.periods, 0);
    assert!(engine.active().is_empty());
}

#[test]
fn stale_and_unknown_requests_are_skipped() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let gone = spawn(&mut world, 900, 2, 100);
    world.despawn(gone);

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    engine.submit(EffectRequest::new(a, gone, TemplateId(1)));
    engine.submit(EffectRequest::new(a, b, TemplateId(42)));
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.processed, 0);
    assert_eq!(report.budget.counters.skipped_stale_entity, 1);
    assert_eq!(report.budget.counters.skipped_missing_template, 1);
    assert_eq!(health(&world, b), 100);
}

#[test]
fn spawn_presets_emit_intents_at_the_target() {
    let mut registries = Registries::with_builtins();
    registries
        .register_template(
            EffectTemplate::new(
                TemplateId(6),
                PresetId::LAUNCH_PROJECTILE,
                EffectLifetime::instant(),
            )
            .with_spawn(SpawnDescriptor {
                archetype: 42,
                count: 2,
            }),
        )
        .unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    let root = engine.submit(EffectRequest::new(a, b, TemplateId(6))).unwrap();
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(report.spawns.len(), 1);
    let intent = report.spawns[0];
    assert_eq!(intent.kind, SpawnKind::Projectile);
    assert_eq!((intent.archetype, intent.count), (42, 2));
    assert_eq!(intent.position, world.position(b));
    assert_eq!(intent.root, root);
}

#[test]
fn duration_effect_without_clock_is_an_error() {
    let mut registries = Registries::with_builtins();
    registries.register_template(dot(2, 2, 3)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    engine.submit(EffectRequest::new(a, b, TemplateId(2))).unwrap();
    let err = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap_err();

    assert!(matches!(err, EngineError::Env(EnvError::ClockNotAvailable)));
    assert_eq!(world.attribute(b, HEALTH), Some(100));
}
