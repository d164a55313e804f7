use bitflags::bitflags;

/// Lifecycle phases an effect passes through, in execution order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EffectPhase {
    /// Request becomes a proposal; listeners may cancel or modify it.
    Propose,
    /// Magnitudes are computed from modifiers and adjustments.
    Calculate,
    /// Candidate targets are gathered.
    Resolve,
    /// Candidates are filtered and child requests emitted.
    Hit,
    /// Attribute deltas and granted tags land on the target.
    Apply,
    /// Recurring tick of a duration effect.
    Period,
    /// Duration ran out or the expire condition fired.
    Expire,
    /// Instance leaves the target; applied state is reverted.
    Remove,
}

impl EffectPhase {
    pub const ALL: [Self; 8] = [
        Self::Propose,
        Self::Calculate,
        Self::Resolve,
        Self::Hit,
        Self::Apply,
        Self::Period,
        Self::Expire,
        Self::Remove,
    ];
    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn flag(self) -> PhaseFlags {
        PhaseFlags::from_bits_retain(1 << self as u8)
    }
}

bitflags! {
    /// Set of [`EffectPhase`]s.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PhaseFlags: u8 {
        const PROPOSE   = 1 << 0;
        const CALCULATE = 1 << 1;
        const RESOLVE   = 1 << 2;
        const HIT       = 1 << 3;
        const APPLY     = 1 << 4;
        const PERIOD    = 1 << 5;
        const EXPIRE    = 1 << 6;
        const REMOVE    = 1 << 7;
    }
}

impl PhaseFlags {
    pub fn has(&self, phase: EffectPhase) -> bool {
        self.contains(phase.flag())
    }
}

/// Position of a handler within one phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PhaseSlot {
    Pre,
    Main,
    Post,
}
