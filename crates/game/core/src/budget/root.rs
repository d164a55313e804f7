use std::fmt;

use crate::config::EngineConfig;

/// Shared id of a top-level request and every child it causes.
///
/// Root 0 is untracked and never limited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RootId(pub u64);

impl RootId {
    pub const UNTRACKED: Self = Self(0);

    pub fn is_untracked(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root:{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct RootSlot {
    root: RootId,
    /// Frame stamp the slot was last written in; stale slots are free.
    stamp: u32,
    used: u32,
}

/// Per-root creation counters in an open-addressing table.
///
/// Slots carry the frame stamp they were written in, so clearing the table
/// at frame start is a single stamp bump.
#[derive(Clone, Debug)]
pub struct RootBudgetTable {
    slots: [RootSlot; EngineConfig::ROOT_TABLE_CAPACITY],
    stamp: u32,
    rejected_full: u32,
}

impl Default for RootBudgetTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RootBudgetTable {
    pub fn new() -> Self {
        Self {
            slots: [RootSlot::default(); EngineConfig::ROOT_TABLE_CAPACITY],
            stamp: 1,
            rejected_full: 0,
        }
    }

    /// Invalidates every slot.
    pub fn advance_frame(&mut self) {
        self.rejected_full = 0;
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            // Wrapped: old stamps could alias the new ones.
            self.slots = [RootSlot::default(); EngineConfig::ROOT_TABLE_CAPACITY];
            self.stamp = 1;
        }
    }

    fn home(root: RootId) -> usize {
        // Fibonacci hashing spreads sequential root ids across the table.
        let hashed = root.0.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (hashed >> 32) as usize % EngineConfig::ROOT_TABLE_CAPACITY
    }

    fn find(&self, root: RootId) -> Option<usize> {
        let home = Self::home(root);
        (0..EngineConfig::ROOT_TABLE_CAPACITY)
            .map(|offset| (home + offset) % EngineConfig::ROOT_TABLE_CAPACITY)
            .find(|&index| {
                let slot = &self.slots[index];
                slot.stamp != self.stamp || slot.root == root
            })
    }

    /// Consumes one unit of `root`'s budget.
    ///
    /// Returns true exactly `limit` times per root per frame. Root 0 always
    /// succeeds. A full table refuses and counts the refusal.
    pub fn try_consume(&mut self, root: RootId, limit: u32) -> bool {
        if root.is_untracked() {
            return true;
        }
        let Some(index) = self.find(root) else {
            self.rejected_full += 1;
            return false;
        };

        let stamp = self.stamp;
        let slot = &mut self.slots[index];
        if slot.stamp != stamp {
            *slot = RootSlot {
                root,
                stamp,
                used: 0,
            };
        }
        if slot.used >= limit {
            return false;
        }
        slot.used += 1;
        true
    }

    /// Units consumed by `root` this frame.
    pub fn used(&self, root: RootId) -> u32 {
        self.find(root)
            .map(|index| &self.slots[index])
            .filter(|slot| slot.stamp == self.stamp && slot.root == root)
            .map_or(0, |slot| slot.used)
    }

    pub fn remaining(&self, root: RootId, limit: u32) -> u32 {
        if root.is_untracked() {
            return u32::MAX;
        }
        limit.saturating_sub(self.used(root))
    }

    /// Consumptions refused this frame because no slot was free.
    pub fn rejected_full(&self) -> u32 {
        self.rejected_full
    }
}
