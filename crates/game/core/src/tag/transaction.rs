use super::{TagId, TagSet};
use crate::config::EngineConfig;

/// What a finished transaction did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    /// Calls to `try_mark_processed`.
    pub steps: u32,
    /// Pairs that were already processed (cycle breaks).
    pub skipped_cycles: u32,
    /// Pairs refused because the capacity or step budget ran out.
    pub skipped_budget: u32,
    /// Cascade work that could not be queued.
    pub dropped: u32,
    /// Set once the budget ran out; the cascade was cut short.
    pub fused: bool,
}

/// Bounded scope around one top-level tag add.
///
/// Each `(tag, is_add)` pair is processed at most once, which breaks attach
/// cycles, and the total work is capped by [`EngineConfig::TRANSACTION_STEP_BUDGET`].
#[derive(Clone, Debug, Default)]
pub struct TagRuleTransaction {
    marked_add: TagSet,
    marked_remove: TagSet,
    entries: usize,
    summary: TransactionSummary,
    active: bool,
}

impl TagRuleTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        *self = Self {
            active: true,
            ..Self::default()
        };
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns false if the pair was already processed or the transaction is out of budget.
    pub fn try_mark_processed(&mut self, tag: TagId, is_add: bool) -> bool {
        self.summary.steps = self.summary.steps.saturating_add(1);
        if self.summary.steps > EngineConfig::TRANSACTION_STEP_BUDGET
            || self.entries >= EngineConfig::TRANSACTION_CAPACITY
        {
            self.summary.skipped_budget += 1;
            self.summary.fused = true;
            return false;
        }

        let marked = if is_add {
            &mut self.marked_add
        } else {
            &mut self.marked_remove
        };
        if !marked.insert(tag) {
            self.summary.skipped_cycles += 1;
            return false;
        }
        self.entries += 1;
        true
    }

    /// Records cascade work that did not fit the scratch queue.
    pub fn note_dropped(&mut self) {
        self.summary.dropped += 1;
        self.summary.fused = true;
    }

    pub fn end(&mut self) -> TransactionSummary {
        self.active = false;
        self.summary
    }
}
