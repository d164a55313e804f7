#![allow(dead_code)]

use gameplay_core::{
    AttributeId, AttributeModifier, ClockDomain, DurationPolicy, EffectLifetime, EffectTemplate,
    EntityHandle, EntityStore, FactionId, GrantedTag, MemoryWorld, OverflowPolicy, Position,
    PresetId, StackPolicy, TagId, TemplateId,
};

pub const HEALTH: AttributeId = AttributeId(0);
pub const ARMOR: AttributeId = AttributeId(1);

pub fn tag(raw: u8) -> TagId {
    TagId::new(raw).expect("non-zero tag id")
}

pub fn spawn(world: &mut MemoryWorld, x: i32, faction: u16, health: i64) -> EntityHandle {
    let entity = world.spawn(Position::new(x, 0), FactionId(faction));
    world.set_attribute(entity, HEALTH, health);
    entity
}

pub fn health(world: &MemoryWorld, entity: EntityHandle) -> i64 {
    world.attribute(entity, HEALTH).unwrap_or_default()
}

pub fn tag_count(world: &MemoryWorld, entity: EntityHandle, raw: u8) -> u16 {
    world.tags(entity).map_or(0, |tags| tags.count(tag(raw)))
}

/// Instant hit that subtracts `amount` health.
pub fn damage(id: u32, amount: i32) -> EffectTemplate {
    EffectTemplate::new(TemplateId(id), PresetId::INSTANT_DAMAGE, EffectLifetime::instant())
        .with_modifier(AttributeModifier::add(HEALTH, -amount))
}

/// Damage over time: `per_tick` every tick for three ticks, stacking to `limit`.
pub fn dot(id: u32, per_tick: i32, limit: u16) -> EffectTemplate {
    EffectTemplate::new(
        TemplateId(id),
        PresetId::DOT,
        EffectLifetime::after_ticks(ClockDomain::FixedFrame, 3).with_period(1),
    )
    .with_modifier(AttributeModifier::add(HEALTH, -per_tick))
    .with_stack(StackPolicy::new(limit, DurationPolicy::Refresh, OverflowPolicy::RemoveOldest))
}

/// Armor buff granting one stack of `granted` per buff stack.
pub fn armor_buff(id: u32, armor: i32, granted: u8, ticks: u32) -> EffectTemplate {
    EffectTemplate::new(
        TemplateId(id),
        PresetId::BUFF,
        EffectLifetime::after_ticks(ClockDomain::FixedFrame, ticks),
    )
    .with_modifier(AttributeModifier::add(ARMOR, armor))
    .with_granted_tag(GrantedTag {
        tag: tag(granted),
        formula: gameplay_core::TagFormula::LinearInStacks { per_stack: 1 },
    })
    .with_stack(StackPolicy::new(2, DurationPolicy::Add, OverflowPolicy::RejectNew))
}
