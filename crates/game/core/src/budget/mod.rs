//! Fixed-capacity budgets consulted before any work that could grow.
//!
//! [`GasBudget`] holds per-frame counters; [`RootBudgetTable`] caps how many
//! child requests a single root request may create. Both reset in O(1) at the
//! start of every frame. Running out of budget is a soft condition: the work is
//! dropped and counted, never returned as an error.

mod gas;
mod root;

pub use gas::{BudgetSummary, DropReason, GasBudget, GasCounters, SkipReason};
pub use root::{RootBudgetTable, RootId};

/// Budgets a cascade step consults before emitting a child request.
#[derive(Debug)]
pub struct BudgetScope<'a> {
    pub gas: &'a mut GasBudget,
    pub roots: &'a mut RootBudgetTable,
    pub root_limit: u32,
    pub max_depth: u8,
}

impl<'a> BudgetScope<'a> {
    pub fn new(
        gas: &'a mut GasBudget,
        roots: &'a mut RootBudgetTable,
        root_limit: u32,
        max_depth: u8,
    ) -> Self {
        Self {
            gas,
            roots,
            root_limit,
            max_depth,
        }
    }

    /// Checks depth and the per-root creation cap for one child.
    ///
    /// Counts the drop reason on failure.
    pub fn try_create_child(&mut self, root: RootId, child_depth: u8) -> bool {
        if child_depth > self.max_depth {
            self.gas.note_dropped(DropReason::Depth);
            return false;
        }
        if !self.roots.try_consume(root, self.root_limit) {
            self.gas.note_dropped(DropReason::RootBudget);
            return false;
        }
        true
    }
}
