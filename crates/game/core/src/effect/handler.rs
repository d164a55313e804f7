use std::fmt;

use super::EffectPhase;
use crate::env::ProgramId;

/// Key of a native phase handler in the handler registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NativeHandlerId(pub u16);

impl NativeHandlerId {
    // ===== built-in handlers, registered by every handler registry =====
    pub const APPLY_MODIFIERS: Self = Self(1);
    pub const REVERT_MODIFIERS: Self = Self(2);
    pub const RESOLVE_TARGETS: Self = Self(3);
    pub const DISPATCH_HITS: Self = Self(4);
    /// Resolve followed by dispatch, for periodic searches.
    pub const FAN_OUT: Self = Self(5);
    pub const LAUNCH_PROJECTILE: Self = Self(6);
    pub const CREATE_UNIT: Self = Self(7);

    /// First id handed out to handlers registered at startup.
    pub const FIRST_CUSTOM: u16 = 64;
}

impl fmt::Display for NativeHandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native:{}", self.0)
    }
}

/// Code run for one phase slot: a native function or an external graph program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhaseHandler {
    Native(NativeHandlerId),
    Graph(ProgramId),
}

/// Pre/Main/Post handlers a template binds to one phase.
///
/// Main comes from the preset unless `skip_main` is set, in which case `main`
/// replaces it (or nothing runs when `main` is `None`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PhaseBinding {
    pub pre: Option<PhaseHandler>,
    pub main: Option<PhaseHandler>,
    pub post: Option<PhaseHandler>,
    pub skip_main: bool,
}

impl PhaseBinding {
    pub fn is_empty(&self) -> bool {
        self.pre.is_none() && self.main.is_none() && self.post.is_none() && !self.skip_main
    }

    pub fn handlers(&self) -> impl Iterator<Item = PhaseHandler> + '_ {
        self.pre.iter().chain(self.main.iter()).chain(self.post.iter()).copied()
    }
}

/// One [`PhaseBinding`] per [`EffectPhase`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PhaseBindings {
    slots: [PhaseBinding; EffectPhase::COUNT],
}

impl PhaseBindings {
    pub fn get(&self, phase: EffectPhase) -> &PhaseBinding {
        &self.slots[phase.index()]
    }

    pub fn set(&mut self, phase: EffectPhase, binding: PhaseBinding) {
        self.slots[phase.index()] = binding;
    }

    /// Phases with a non-empty binding, in phase order.
    pub fn bound(&self) -> impl Iterator<Item = (EffectPhase, &PhaseBinding)> + '_ {
        EffectPhase::ALL
            .into_iter()
            .zip(self.slots.iter())
            .filter(|(_, binding)| !binding.is_empty())
    }
}
