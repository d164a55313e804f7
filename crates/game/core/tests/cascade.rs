//! Cascades: fan-out, response ordering, chained responses and the budgets
//! that keep them finite.

mod common;

use common::{damage, health, spawn, tag_count};
use gameplay_core::{
    ClockDomain, Clocks, ContextSlot, DispatchDescriptor, EffectEngine, EffectLifetime,
    EffectPhase, EffectRequest, EffectTemplate, EngineConfig, EngineEnv, FilterDescriptor,
    GrantedTag, GridSpatialIndex, ListenerScope, MemoryWorld, PresetId, QueryDescriptor,
    QueryShape, Registries, ResponseKind, ResponseListener, RootBudgetTable, RootId, TagRuleSet,
    TargetingDescriptor, TemplateId,
};

const BOLT: TemplateId = TemplateId(1);

fn nova(id: u32, max_targets: u16) -> EffectTemplate {
    EffectTemplate::new(TemplateId(id), PresetId::SEARCH, EffectLifetime::instant()).with_targeting(
        TargetingDescriptor::new()
            .with_query(QueryDescriptor::Spatial {
                shape: QueryShape::Circle { radius: 2000 },
                origin: ContextSlot::Source,
                max_candidates: 0,
            })
            .with_filter(
                FilterDescriptor::default()
                    .excluding_source()
                    .with_max_targets(max_targets),
            )
            .with_dispatch(DispatchDescriptor::aoe(BOLT)),
    )
}

fn thorns() -> ResponseListener {
    ResponseListener::new(
        EffectPhase::Propose,
        ListenerScope::Target,
        ResponseKind::Chain {
            template: BOLT,
            target: ContextSlot::Source,
        },
    )
}

#[test]
fn search_fans_out_to_capped_children_under_one_root() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();
    registries.register_template(nova(20, 3)).unwrap();

    let mut world = MemoryWorld::new();
    let caster = spawn(&mut world, 0, 1, 100);
    let enemies: Vec<_> = (1..=10)
        .map(|i| spawn(&mut world, 100 * i, 2, 100))
        .collect();
    let index = world.spatial_index(GridSpatialIndex::DEFAULT_CELL_SIZE);

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    let root = engine
        .submit(EffectRequest::new(caster, caster, TemplateId(20)))
        .unwrap();
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_spatial(&index))
        .unwrap();

    assert_eq!(report.processed, 4);
    assert_eq!(report.applied, 4);
    assert_eq!(report.fan_out.emitted, 3);
    assert_eq!(engine.root_usage(root), 3);
    assert!(report.resolutions.iter().all(|r| r.root == root));
    assert_eq!(report.resolutions_of(root).filter(|r| r.depth == 1).count(), 3);

    // Nearest first.
    let hit: Vec<i64> = enemies.iter().map(|&e| health(&world, e)).collect();
    assert_eq!(&hit[..3], &[90, 90, 90]);
    assert!(hit[3..].iter().all(|&h| h == 100));
    assert_eq!(health(&world, caster), 100);
}

#[test]
fn root_cap_stops_fan_out_at_first_refusal() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();
    registries.register_template(nova(20, 0)).unwrap();

    let mut world = MemoryWorld::new();
    let caster = spawn(&mut world, 0, 1, 100);
    for i in 1..=6 {
        spawn(&mut world, 100 * i, 2, 100);
    }
    let index = world.spatial_index(GridSpatialIndex::DEFAULT_CELL_SIZE);

    let config = EngineConfig::default().with_root_creations(4);
    let mut engine = EffectEngine::new(&registries, config);
    let root = engine
        .submit(EffectRequest::new(caster, caster, TemplateId(20)))
        .unwrap();
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_spatial(&index))
        .unwrap();

    assert_eq!(report.fan_out.emitted, 4);
    assert_eq!(report.fan_out.dropped, 2);
    assert_eq!(report.fan_out.emitted + report.fan_out.dropped, 6);
    assert_eq!(report.budget.counters.dropped_root_budget, 1);
    assert_eq!(engine.root_usage(root), 4);
    assert!(report.budget.fused);
}

#[test]
fn every_eligible_candidate_lands_in_a_counter() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();
    registries.register_template(nova(20, 0)).unwrap();

    let mut world = MemoryWorld::new();
    let caster = spawn(&mut world, 0, 1, 100);
    let enemies: Vec<_> = (1..=10).map(|i| spawn(&mut world, 100 * i, 2, 100)).collect();
    let index = world.spatial_index(GridSpatialIndex::DEFAULT_CELL_SIZE);

    let config = EngineConfig::default().with_root_creations(2);
    let mut engine = EffectEngine::new(&registries, config);
    engine.submit(EffectRequest::new(caster, caster, TemplateId(20)));
    let report = engine
        .run_frame(&mut world, &EngineEnv::empty().with_spatial(&index))
        .unwrap();

    assert_eq!(report.fan_out.filtered, 1);
    assert_eq!((report.fan_out.emitted, report.fan_out.dropped), (2, 8));
    assert_eq!(report.budget.counters.dropped_root_budget, 1);
    assert_eq!(enemies.iter().filter(|&&e| health(&world, e) == 90).count(), 2);
}

#[test]
fn periodic_search_pulses_until_expiry() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();
    registries
        .register_template(
            EffectTemplate::new(
                TemplateId(21),
                PresetId::PERIODIC_SEARCH,
                EffectLifetime::after_ticks(ClockDomain::FixedFrame, 2).with_period(1),
            )
            .with_targeting(
                TargetingDescriptor::new()
                    .with_query(QueryDescriptor::circle(1000))
                    .with_filter(FilterDescriptor::default().excluding_source())
                    .with_dispatch(DispatchDescriptor::aoe(BOLT)),
            ),
        )
        .unwrap();

    let mut world = MemoryWorld::new();
    let caster = spawn(&mut world, 0, 1, 100);
    let near = spawn(&mut world, 100, 2, 100);
    let far = spawn(&mut world, 5000, 2, 100);
    let index = world.spatial_index(GridSpatialIndex::DEFAULT_CELL_SIZE);
    let mut clocks = Clocks::new();
    let mut engine = EffectEngine::new(&registries, EngineConfig::default());

    engine
        .submit(EffectRequest::new(caster, caster, TemplateId(21)))
        .unwrap();
    let report = engine
        .run_frame(
            &mut world,
            &EngineEnv::empty().with_clock(&clocks).with_spatial(&index),
        )
        .unwrap();
    assert_eq!(report.created, 1);

    let mut expired = 0;
    for _ in 0..2 {
        clocks.advance(ClockDomain::FixedFrame);
        let report = engine
            .run_frame(
                &mut world,
                &EngineEnv::empty().with_clock(&clocks).with_spatial(&index),
            )
            .unwrap();
        assert_eq!(report.periods, 1);
        assert_eq!(report.applied, 1);
        expired += report.expired;
    }

    assert_eq!(expired, 1);
    assert_eq!(health(&world, near), 80);
    assert_eq!(health(&world, far), 100);
    assert!(engine.active().is_empty());
}

#[test]
fn listeners_fire_by_priority_then_target_before_source() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    let prompt = |scope, priority| {
        ResponseListener::new(EffectPhase::Propose, scope, ResponseKind::PromptInput { prompt: 1 })
            .with_priority(priority)
    };
    let on_b = world.listeners_mut(b).unwrap();
    on_b.push(prompt(ListenerScope::Target, 5)).unwrap();
    on_b.push(prompt(ListenerScope::Target, 1)).unwrap();
    let on_a = world.listeners_mut(a).unwrap();
    on_a.push(prompt(ListenerScope::Source, 10)).unwrap();
    on_a.push(prompt(ListenerScope::Source, 5)).unwrap();

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    engine.submit(EffectRequest::new(a, b, TemplateId(1)));
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    let fired: Vec<_> = engine
        .telemetry()
        .iter()
        .map(|record| (record.priority, record.owner))
        .collect();
    assert_eq!(fired, vec![(10, a), (5, b), (5, a), (1, b)]);
    assert_eq!(report.applied, 1);
    assert_eq!(health(&world, b), 90);
}

#[test]
fn mutual_thorns_stop_at_the_depth_limit() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    world.listeners_mut(a).unwrap().push(thorns()).unwrap();
    world.listeners_mut(b).unwrap().push(thorns()).unwrap();

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    let root = engine.submit(EffectRequest::new(a, b, BOLT)).unwrap();
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    // Depths 0 through 5 resolve; the depth-6 child is refused.
    assert_eq!(report.applied, 6);
    assert_eq!(report.resolutions.iter().map(|r| r.depth).max(), Some(5));
    assert_eq!(report.budget.counters.dropped_depth, 1);
    assert_eq!(engine.root_usage(root), 5);
    assert_eq!(health(&world, a), 70);
    assert_eq!(health(&world, b), 70);
    assert_eq!(engine.pending(), 0);
}

#[test]
fn root_cap_bounds_chained_responses() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);
    world.listeners_mut(a).unwrap().push(thorns()).unwrap();
    world.listeners_mut(b).unwrap().push(thorns()).unwrap();

    let config = EngineConfig::default().with_root_creations(2);
    let mut engine = EffectEngine::new(&registries, config);
    engine.submit(EffectRequest::new(a, b, BOLT)).unwrap();
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(report.applied, 3);
    assert_eq!(report.budget.counters.dropped_root_budget, 1);
    assert_eq!(report.budget.counters.dropped_depth, 0);
}

#[test]
fn untracked_roots_ignore_the_root_cap() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 1000);
    let b = spawn(&mut world, 500, 2, 1000);
    world.listeners_mut(a).unwrap().push(thorns()).unwrap();
    world.listeners_mut(b).unwrap().push(thorns()).unwrap();

    let config = EngineConfig::default().with_root_creations(2);
    let mut engine = EffectEngine::new(&registries, config);
    assert!(engine.submit_untracked(EffectRequest::new(a, b, BOLT)));
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    // Only the depth limit applies.
    assert_eq!(report.applied, 6);
    assert_eq!(report.budget.counters.dropped_root_budget, 0);
    assert_eq!(report.budget.counters.dropped_depth, 1);
}

#[test]
fn attach_cycle_in_granted_tags_settles() {
    let mut registries = Registries::with_builtins();
    let mut burning = TagRuleSet::default();
    burning.attached.push(2);
    let mut smoking = TagRuleSet::default();
    smoking.attached.push(1);
    registries.register_tag_rule(1, &burning).unwrap();
    registries.register_tag_rule(2, &smoking).unwrap();
    registries
        .register_template(damage(1, 10).with_granted_tag(GrantedTag::fixed(common::tag(1), 1)))
        .unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    engine.submit(EffectRequest::new(a, b, BOLT)).unwrap();
    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(tag_count(&world, b, 1), 1);
    assert_eq!(tag_count(&world, b, 2), 1);
    assert_eq!(report.budget.counters.tag_transactions_fused, 0);
}

#[test]
fn root_budget_is_monotonic_within_a_frame() {
    let mut table = RootBudgetTable::new();
    let root = RootId(9);

    let granted = (0..10).filter(|_| table.try_consume(root, 4)).count();
    assert_eq!(granted, 4);
    assert_eq!(table.used(root), 4);
    assert!((0..1000).all(|_| table.try_consume(RootId::UNTRACKED, 4)));

    table.advance_frame();
    assert_eq!(table.used(root), 0);
    assert!(table.try_consume(root, 4));
}

#[test]
fn queue_overflow_is_counted_next_frame() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 1)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 1000);
    let b = spawn(&mut world, 500, 2, 1000);

    let mut engine = EffectEngine::new(&registries, EngineConfig::default());
    let refused = (0..330)
        .filter(|_| engine.submit(EffectRequest::new(a, b, BOLT)).is_none())
        .count();
    assert_eq!(refused, 10);

    let report = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();
    assert_eq!(report.budget.counters.dropped_queue, 10);
    assert!(report.budget.fused);
    assert_eq!(report.processed, 320);
    assert_eq!(health(&world, b), 680);
}

#[test]
fn request_cap_carries_work_over() {
    let mut registries = Registries::with_builtins();
    registries.register_template(damage(1, 10)).unwrap();

    let mut world = MemoryWorld::new();
    let a = spawn(&mut world, 0, 1, 100);
    let b = spawn(&mut world, 500, 2, 100);

    let mut engine = EffectEngine::new(&registries, EngineConfig::default().with_requests(2));
    for _ in 0..5 {
        engine.submit(EffectRequest::new(a, b, BOLT)).unwrap();
    }

    let first = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();
    assert_eq!((first.processed, first.carried_over), (2, 3));
    assert_eq!(engine.pending(), 3);

    let second = engine.run_frame(&mut world, &EngineEnv::empty()).unwrap();
    assert_eq!((second.processed, second.carried_over), (2, 1));
    assert_eq!(health(&world, b), 60);
}
