use std::fmt;

use bitflags::bitflags;

use super::{EffectPhase, LifetimeFlags, NativeHandlerId, PhaseFlags};

/// Identifier of a preset type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PresetId(pub u16);

impl PresetId {
    pub const INSTANT_DAMAGE: Self = Self(1);
    pub const DOT: Self = Self(2);
    pub const BUFF: Self = Self(3);
    pub const SEARCH: Self = Self(4);
    pub const PERIODIC_SEARCH: Self = Self(5);
    pub const LAUNCH_PROJECTILE: Self = Self(6);
    pub const CREATE_UNIT: Self = Self(7);
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preset:{}", self.0)
    }
}

bitflags! {
    /// Optional template components.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ComponentFlags: u16 {
        const MODIFIERS       = 1 << 0;
        const GRANTED_TAGS    = 1 << 1;
        const TARGET_QUERY    = 1 << 2;
        const TARGET_FILTER   = 1 << 3;
        const TARGET_DISPATCH = 1 << 4;
        const PERIOD          = 1 << 5;
        const STACK_POLICY    = 1 << 6;
        const DURATION        = 1 << 7;
        const SPAWN           = 1 << 8;
    }
}

impl ComponentFlags {
    pub const TARGETING: Self = Self::TARGET_QUERY
        .union(Self::TARGET_FILTER)
        .union(Self::TARGET_DISPATCH);
}

/// Shape every template of a preset must follow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetType {
    pub name: String,
    pub active_phases: PhaseFlags,
    pub lifetimes: LifetimeFlags,
    /// Components a template must carry.
    pub required: ComponentFlags,
    /// Components a template may carry (a superset of `required`).
    pub allowed: ComponentFlags,
}

impl PresetType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active_phases: PhaseFlags::PROPOSE | PhaseFlags::CALCULATE,
            lifetimes: LifetimeFlags::INSTANT,
            required: ComponentFlags::empty(),
            allowed: ComponentFlags::empty(),
        }
    }

    pub fn with_phases(mut self, phases: PhaseFlags) -> Self {
        self.active_phases |= phases;
        self
    }

    pub fn with_lifetimes(mut self, lifetimes: LifetimeFlags) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    pub fn requiring(mut self, components: ComponentFlags) -> Self {
        self.required |= components;
        self.allowed |= components;
        self
    }

    pub fn allowing(mut self, components: ComponentFlags) -> Self {
        self.allowed |= components;
        self
    }
}

/// Catalog of preset types, indexed by [`PresetId`].
#[derive(Clone, Debug, Default)]
pub struct PresetRegistry {
    presets: Vec<Option<PresetType>>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in presets under their fixed ids.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let duration = ComponentFlags::DURATION | ComponentFlags::STACK_POLICY;

        registry.register(
            PresetId::INSTANT_DAMAGE,
            PresetType::new("instant_damage")
                .with_phases(PhaseFlags::APPLY)
                .requiring(ComponentFlags::MODIFIERS)
                .allowing(ComponentFlags::GRANTED_TAGS),
        );
        registry.register(
            PresetId::DOT,
            PresetType::new("dot")
                .with_phases(
                    PhaseFlags::APPLY | PhaseFlags::PERIOD | PhaseFlags::EXPIRE | PhaseFlags::REMOVE,
                )
                .with_lifetimes(LifetimeFlags::DURATION)
                .requiring(ComponentFlags::MODIFIERS | ComponentFlags::PERIOD)
                .allowing(ComponentFlags::GRANTED_TAGS | duration),
        );
        registry.register(
            PresetId::BUFF,
            PresetType::new("buff")
                .with_phases(PhaseFlags::APPLY | PhaseFlags::EXPIRE | PhaseFlags::REMOVE)
                .with_lifetimes(LifetimeFlags::DURATION)
                .allowing(ComponentFlags::MODIFIERS | ComponentFlags::GRANTED_TAGS | duration),
        );
        registry.register(
            PresetId::SEARCH,
            PresetType::new("search")
                .with_phases(PhaseFlags::RESOLVE | PhaseFlags::HIT)
                .requiring(ComponentFlags::TARGET_QUERY | ComponentFlags::TARGET_DISPATCH)
                .allowing(ComponentFlags::TARGET_FILTER),
        );
        registry.register(
            PresetId::PERIODIC_SEARCH,
            PresetType::new("periodic_search")
                .with_phases(
                    PhaseFlags::APPLY | PhaseFlags::PERIOD | PhaseFlags::EXPIRE | PhaseFlags::REMOVE,
                )
                .with_lifetimes(LifetimeFlags::DURATION)
                .requiring(
                    ComponentFlags::TARGET_QUERY
                        | ComponentFlags::TARGET_DISPATCH
                        | ComponentFlags::PERIOD,
                )
                .allowing(ComponentFlags::TARGET_FILTER | ComponentFlags::GRANTED_TAGS | duration),
        );
        registry.register(
            PresetId::LAUNCH_PROJECTILE,
            PresetType::new("launch_projectile")
                .with_phases(PhaseFlags::APPLY)
                .requiring(ComponentFlags::SPAWN),
        );
        registry.register(
            PresetId::CREATE_UNIT,
            PresetType::new("create_unit")
                .with_phases(PhaseFlags::APPLY)
                .requiring(ComponentFlags::SPAWN)
                .allowing(ComponentFlags::GRANTED_TAGS),
        );
        registry
    }

    /// Stores a preset, replacing any previous one with the same id.
    pub fn register(&mut self, id: PresetId, preset: PresetType) {
        let index = id.0 as usize;
        if self.presets.len() <= index {
            self.presets.resize(index + 1, None);
        }
        if let Some(previous) = self.presets[index].replace(preset) {
            tracing::warn!(%id, previous = %previous.name, "preset re-registered");
        }
    }

    pub fn get(&self, id: PresetId) -> Option<&PresetType> {
        self.presets.get(id.0 as usize)?.as_ref()
    }

    /// Looks a preset up by its registered name.
    pub fn find(&self, name: &str) -> Option<PresetId> {
        self.presets.iter().enumerate().find_map(|(index, preset)| {
            preset
                .as_ref()
                .filter(|preset| preset.name.eq_ignore_ascii_case(name))
                .map(|_| PresetId(index as u16))
        })
    }
}

/// Built-in Main handler for each (preset, phase).
#[derive(Clone, Debug, Default)]
pub struct PresetBehaviorRegistry {
    mains: Vec<[Option<NativeHandlerId>; EffectPhase::COUNT]>,
}

impl PresetBehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.set(PresetId::INSTANT_DAMAGE, EffectPhase::Apply, NativeHandlerId::APPLY_MODIFIERS);
        registry.set(PresetId::DOT, EffectPhase::Period, NativeHandlerId::APPLY_MODIFIERS);
        registry.set(PresetId::BUFF, EffectPhase::Apply, NativeHandlerId::APPLY_MODIFIERS);
        registry.set(PresetId::BUFF, EffectPhase::Remove, NativeHandlerId::REVERT_MODIFIERS);
        registry.set(PresetId::SEARCH, EffectPhase::Resolve, NativeHandlerId::RESOLVE_TARGETS);
        registry.set(PresetId::SEARCH, EffectPhase::Hit, NativeHandlerId::DISPATCH_HITS);
        registry.set(PresetId::PERIODIC_SEARCH, EffectPhase::Period, NativeHandlerId::FAN_OUT);
        registry.set(
            PresetId::LAUNCH_PROJECTILE,
            EffectPhase::Apply,
            NativeHandlerId::LAUNCH_PROJECTILE,
        );
        registry.set(PresetId::CREATE_UNIT, EffectPhase::Apply, NativeHandlerId::CREATE_UNIT);
        registry
    }

    pub fn set(&mut self, preset: PresetId, phase: EffectPhase, handler: NativeHandlerId) {
        let index = preset.0 as usize;
        if self.mains.len() <= index {
            self.mains.resize(index + 1, [None; EffectPhase::COUNT]);
        }
        self.mains[index][phase.index()] = Some(handler);
    }

    pub fn main(&self, preset: PresetId, phase: EffectPhase) -> Option<NativeHandlerId> {
        self.mains.get(preset.0 as usize)?[phase.index()]
    }

    /// Every handler id referenced by any preset.
    pub fn handlers(&self) -> impl Iterator<Item = NativeHandlerId> + '_ {
        self.mains.iter().flat_map(|phases| phases.iter().flatten().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::LifetimeKind;

    #[test]
    fn builtins_are_registered() {
        let presets = PresetRegistry::with_builtins();
        let dot = presets.get(PresetId::DOT).unwrap();
        assert!(dot.lifetimes.allows(LifetimeKind::AfterTicks));
        assert!(!dot.lifetimes.allows(LifetimeKind::Instant));
        assert!(dot.required.contains(ComponentFlags::PERIOD));
        assert!(dot.allowed.contains(dot.required));
        assert_eq!(presets.find("Periodic_Search"), Some(PresetId::PERIODIC_SEARCH));
        assert_eq!(presets.find("teleport"), None);
    }

    #[test]
    fn behaviors_only_cover_active_phases() {
        let presets = PresetRegistry::with_builtins();
        let behaviors = PresetBehaviorRegistry::with_builtins();
        for id in 1..=7 {
            let preset = PresetId(id);
            let active = presets.get(preset).unwrap().active_phases;
            for phase in EffectPhase::ALL {
                if behaviors.main(preset, phase).is_some() {
                    assert!(active.has(phase), "{preset} has a main for inactive {phase}");
                }
            }
        }
        assert_eq!(
            behaviors.main(PresetId::SEARCH, EffectPhase::Hit),
            Some(NativeHandlerId::DISPATCH_HITS)
        );
        assert_eq!(behaviors.main(PresetId(99), EffectPhase::Hit), None);
    }
}
