use bitflags::bitflags;

use crate::clock::ClockDomain;

/// How long an effect instance lives.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LifetimeKind {
    /// Applies once and never becomes an active instance.
    #[default]
    Instant,
    /// Lives for a fixed number of ticks of its clock domain.
    AfterTicks,
    /// Lives until removed or its expire condition fires.
    Infinite,
}

impl LifetimeKind {
    pub const fn flag(self) -> LifetimeFlags {
        match self {
            Self::Instant => LifetimeFlags::INSTANT,
            Self::AfterTicks => LifetimeFlags::AFTER_TICKS,
            Self::Infinite => LifetimeFlags::INFINITE,
        }
    }

    pub const fn is_instant(self) -> bool {
        matches!(self, Self::Instant)
    }
}

bitflags! {
    /// Lifetime kinds a preset accepts.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct LifetimeFlags: u8 {
        const INSTANT     = 1 << 0;
        const AFTER_TICKS = 1 << 1;
        const INFINITE    = 1 << 2;
        const DURATION    = Self::AFTER_TICKS.bits() | Self::INFINITE.bits();
    }
}

impl LifetimeFlags {
    pub fn allows(&self, kind: LifetimeKind) -> bool {
        self.contains(kind.flag())
    }
}

/// Lifetime block of an effect template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EffectLifetime {
    pub kind: LifetimeKind,
    /// Clock domain durations and periods are measured in.
    pub clock: ClockDomain,
    /// Total lifetime for `AfterTicks`; ignored otherwise.
    pub duration_ticks: u32,
    /// Interval between Period phases; 0 means no periodic ticking.
    pub period_ticks: u32,
}

impl EffectLifetime {
    pub fn instant() -> Self {
        Self::default()
    }

    pub fn after_ticks(clock: ClockDomain, duration_ticks: u32) -> Self {
        Self {
            kind: LifetimeKind::AfterTicks,
            clock,
            duration_ticks,
            period_ticks: 0,
        }
    }

    pub fn infinite(clock: ClockDomain) -> Self {
        Self {
            kind: LifetimeKind::Infinite,
            clock,
            duration_ticks: 0,
            period_ticks: 0,
        }
    }

    pub fn with_period(mut self, period_ticks: u32) -> Self {
        self.period_ticks = period_ticks;
        self
    }

    pub fn is_periodic(&self) -> bool {
        self.period_ticks > 0 && !self.kind.is_instant()
    }
}
