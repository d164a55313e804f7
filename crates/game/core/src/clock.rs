//! Clock domains.
//!
//! Several independent monotonic tick counters run side by side (fixed frame,
//! simulation step, turn, physics, navigation). The owning loop advances each
//! one explicitly; effects and tags only ever read them through
//! [`ClockSource`].

use std::fmt;

/// Discrete time unit of a clock domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Ticks from `self` until `later`, or 0 if `later` already passed.
    pub fn until(self, later: Tick) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0.saturating_add(rhs))
    }
}

impl std::ops::Sub<u64> for Tick {
    type Output = Tick;
    fn sub(self, rhs: u64) -> Tick {
        Tick(self.0.saturating_sub(rhs))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Independent tick counter an effect or tag references.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ClockDomain {
    /// Rendered/fixed frame counter.
    #[default]
    FixedFrame,
    /// Deterministic simulation step.
    SimulationStep,
    /// Turn counter for turn-based rule sets.
    Turn,
    Physics,
    Navigation,
}

impl ClockDomain {
    pub const ALL: [Self; 5] = [
        Self::FixedFrame,
        Self::SimulationStep,
        Self::Turn,
        Self::Physics,
        Self::Navigation,
    ];
    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Read-only access to the current tick of each domain.
pub trait ClockSource {
    fn now(&self, domain: ClockDomain) -> Tick;
}

/// Owned set of clock domains, advanced by the simulation loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clocks {
    ticks: [Tick; ClockDomain::COUNT],
}

impl Clocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances one domain by a single tick and returns the new value.
    pub fn advance(&mut self, domain: ClockDomain) -> Tick {
        self.advance_by(domain, 1)
    }

    pub fn advance_by(&mut self, domain: ClockDomain, ticks: u64) -> Tick {
        let slot = &mut self.ticks[domain.index()];
        *slot = *slot + ticks;
        *slot
    }

    /// Overwrites a domain, e.g. when restoring a snapshot.
    ///
    /// Domains are monotonic during play; moving one backwards is only valid
    /// while no effects are active.
    pub fn set(&mut self, domain: ClockDomain, tick: Tick) {
        self.ticks[domain.index()] = tick;
    }
}

impl ClockSource for Clocks {
    fn now(&self, domain: ClockDomain) -> Tick {
        self.ticks[domain.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_advance_independently() {
        let mut clocks = Clocks::new();
        clocks.advance(ClockDomain::Turn);
        clocks.advance_by(ClockDomain::Physics, 4);

        assert_eq!(clocks.now(ClockDomain::Turn), Tick(1));
        assert_eq!(clocks.now(ClockDomain::Physics), Tick(4));
        assert_eq!(clocks.now(ClockDomain::FixedFrame), Tick::ZERO);
    }

    #[test]
    fn parses_domain_names() {
        let domain: ClockDomain = "simulation_step".parse().unwrap();
        assert_eq!(domain, ClockDomain::SimulationStep);
        assert_eq!(ClockDomain::Navigation.to_string(), "navigation");
    }

    #[test]
    fn until_saturates() {
        assert_eq!(Tick(5).until(Tick(8)), 3);
        assert_eq!(Tick(8).until(Tick(5)), 0);
    }
}
