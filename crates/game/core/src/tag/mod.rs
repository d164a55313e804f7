//! Gameplay tag system.
//!
//! Tags are small integers (`1..=255`) that mark boolean gameplay states.
//! Each entity carries an [`EntityTags`] container: a 256-bit presence set plus
//! a sparse stack-count map. Rules compiled by the [`TagRuleRegistry`] decide
//! what else happens when a tag becomes present, and [`TagOps`] is the only
//! mutator, applying those rules inside a bounded [`TagRuleTransaction`].
//!
//! # Invariant
//!
//! A tag is present in the set iff its stack count is non-zero. Every mutator
//! in this module maintains it; violations surface as [`TagError`].

mod counts;
mod id;
mod ops;
mod rule;
mod set;
mod transaction;

pub use counts::{TagCount, TagCountMap};
pub use id::TagId;
pub use ops::{AddOutcome, RemoveOutcome, TagOps, TagSense};
pub use rule::{RuleFlags, TagRuleCompiled, TagRuleRegistry, TagRuleSet};
pub use set::{TagSet, TagSetIter};
pub use transaction::{TagRuleTransaction, TransactionSummary};

use crate::config::EngineConfig;
use crate::error::{CoreError, ErrorSeverity};

/// Hard invariant violations raised by tag containers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// Stack count for a tag would exceed `u16::MAX`.
    #[error("stack count for tag {tag} overflowed")]
    StackOverflow { tag: TagId },

    /// The per-entity stack-count map has no free entry.
    #[error("stack-count map full ({capacity} entries) while adding tag {tag}")]
    CountCapacityExceeded { tag: TagId, capacity: usize },
}

impl CoreError for TagError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Invariant
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::StackOverflow { .. } => "TAG_STACK_OVERFLOW",
            Self::CountCapacityExceeded { .. } => "TAG_COUNT_CAPACITY_EXCEEDED",
        }
    }
}

/// Configuration errors raised while compiling a rule set.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TagRuleError {
    /// A tag id outside `1..=255`.
    #[error("tag id {raw} in {field} is outside 1..=255")]
    InvalidTagId { raw: u16, field: &'static str },

    /// The same tag is both required and blocked.
    #[error("tag {tag} both requires and blocks tag {conflicting}")]
    RequiredAndBlocked { tag: TagId, conflicting: TagId },

    /// A tag that blocks itself can never be added.
    #[error("tag {tag} blocks itself")]
    SelfBlocking { tag: TagId },
}

impl CoreError for TagRuleError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Configuration
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTagId { .. } => "TAG_RULE_INVALID_TAG_ID",
            Self::RequiredAndBlocked { .. } => "TAG_RULE_REQUIRED_AND_BLOCKED",
            Self::SelfBlocking { .. } => "TAG_RULE_SELF_BLOCKING",
        }
    }
}

/// Tags that changed during one or more operations.
///
/// Callers collect these to fire deferred triggers after the mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyTags {
    pub added: TagSet,
    pub removed: TagSet,
}

impl DirtyTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Every tag touched in either direction.
    pub fn changed(&self) -> TagSet {
        self.added.union(&self.removed)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn mark_added(&mut self, tag: TagId) {
        self.added.insert(tag);
    }

    fn mark_removed(&mut self, tag: TagId) {
        self.removed.insert(tag);
    }
}

/// Per-entity tag container: presence set plus stack counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityTags {
    present: TagSet,
    counts: TagCountMap,
}

impl EntityTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn present(&self) -> &TagSet {
        &self.present
    }

    pub fn counts(&self) -> &TagCountMap {
        &self.counts
    }

    pub fn contains(&self, tag: TagId) -> bool {
        self.present.contains(tag)
    }

    pub fn count(&self, tag: TagId) -> u16 {
        self.counts.get(tag)
    }

    /// Checks the presence/count invariant. Intended for tests and debug asserts.
    pub fn is_consistent(&self) -> bool {
        let counted = self
            .counts
            .iter()
            .all(|entry| entry.count > 0 && self.present.contains(entry.tag));
        counted && self.present.len() == self.counts.len()
    }

    /// Marks a new tag present with a stack count of one.
    fn insert_new(&mut self, tag: TagId) -> Result<(), TagError> {
        self.counts.increment(tag)?;
        self.present.insert(tag);
        Ok(())
    }

    /// Bumps the stack count of an already present tag.
    fn stack(&mut self, tag: TagId) -> Result<u16, TagError> {
        self.counts.increment(tag)
    }

    /// Drops one stack; clears presence when the count reaches zero.
    fn unstack(&mut self, tag: TagId) -> u16 {
        let remaining = self.counts.decrement(tag);
        if remaining == 0 {
            self.present.remove(tag);
        }
        remaining
    }

    /// Clears a tag regardless of its stack count.
    fn clear_tag(&mut self, tag: TagId) {
        self.counts.clear(tag);
        self.present.remove(tag);
    }
}

const _: () = assert!(EngineConfig::MAX_TAGS == TagSet::CAPACITY);
