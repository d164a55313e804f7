use arrayvec::ArrayVec;

use super::{
    DirtyTags, EntityTags, RuleFlags, TagError, TagId, TagRuleRegistry, TagRuleTransaction,
    TagSet, TransactionSummary,
};
use crate::config::EngineConfig;

/// Which notion of "has" a query uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagSense {
    /// The raw presence bit.
    #[default]
    Present,
    /// Present and not disabled by any DisabledIf tag.
    Effective,
}

/// Result of [`TagOps::add_tag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Tag was already present; its count is now the given value.
    Stacked(u16),
    /// Tag became present.
    Added,
    /// Tag became present but the cascade removed it again.
    Reverted,
    /// Required/Blocked rules refused the tag.
    Rejected,
    /// The transaction budget ran out before the tag was processed.
    Skipped,
}

impl AddOutcome {
    /// True if the tag is present after the call.
    pub fn is_present(self) -> bool {
        matches!(self, Self::Stacked(_) | Self::Added)
    }
}

/// Result of [`TagOps::remove_tag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    NotPresent,
    /// One stack removed; the given count remains.
    Decremented(u16),
    /// Last stack removed; the tag is no longer present.
    Removed,
}

#[derive(Clone, Copy, Debug)]
enum TagStep {
    Add(TagId),
    Remove(TagId),
    RecheckRemoveIf(TagId),
}

/// The only mutator of [`EntityTags`]; applies compiled rules transactionally.
#[derive(Debug)]
pub struct TagOps<'r> {
    registry: &'r TagRuleRegistry,
    txn: TagRuleTransaction,
    last_summary: TransactionSummary,
}

impl<'r> TagOps<'r> {
    pub fn new(registry: &'r TagRuleRegistry) -> Self {
        Self {
            registry,
            txn: TagRuleTransaction::new(),
            last_summary: TransactionSummary::default(),
        }
    }

    pub fn registry(&self) -> &'r TagRuleRegistry {
        self.registry
    }

    /// Summary of the most recent rule transaction (default for fast-path adds).
    pub fn last_summary(&self) -> TransactionSummary {
        self.last_summary
    }

    pub fn add_tag(
        &mut self,
        tags: &mut EntityTags,
        tag: TagId,
        mut dirty: Option<&mut DirtyTags>,
    ) -> Result<AddOutcome, TagError> {
        self.last_summary = TransactionSummary::default();

        if tags.contains(tag) {
            return tags.stack(tag).map(AddOutcome::Stacked);
        }

        let needs_cascade = self.registry.has_rule(tag)
            || self.registry.dependents_of(tag).intersects(tags.present());
        if !needs_cascade {
            tags.insert_new(tag)?;
            if let Some(dirty) = dirty.as_deref_mut() {
                dirty.mark_added(tag);
            }
            return Ok(AddOutcome::Added);
        }

        // A capacity error mid-cascade rolls the entity back to its state
        // before the call.
        let snapshot = tags.clone();
        let dirty_snapshot = dirty.as_deref().copied();
        self.txn.begin();
        let result = self.cascade(tags, tag, dirty.as_deref_mut());
        self.last_summary = self.txn.end();
        if result.is_err() {
            *tags = snapshot;
            if let (Some(dirty), Some(before)) = (dirty, dirty_snapshot) {
                *dirty = before;
            }
        }
        if self.last_summary.fused {
            tracing::warn!(
                %tag,
                steps = self.last_summary.steps,
                skipped = self.last_summary.skipped_budget,
                dropped = self.last_summary.dropped,
                "tag rule transaction fused"
            );
        }
        result
    }

    fn cascade(
        &mut self,
        tags: &mut EntityTags,
        root: TagId,
        mut dirty: Option<&mut DirtyTags>,
    ) -> Result<AddOutcome, TagError> {
        let registry = self.registry;
        let mut queue: ArrayVec<TagStep, { EngineConfig::TRANSACTION_CAPACITY }> = ArrayVec::new();
        let mut cursor = 0;
        let mut root_added = false;
        let mut root_rejected = false;

        queue.push(TagStep::Add(root));

        while let Some(step) = queue.get(cursor).copied() {
            cursor += 1;
            match step {
                TagStep::Add(tag) => {
                    if tags.contains(tag) || !self.txn.try_mark_processed(tag, true) {
                        continue;
                    }
                    let rule = registry.get(tag);
                    if rule.is_some_and(|rule| !rule.can_add(tags.present())) {
                        root_rejected |= tag == root;
                        continue;
                    }

                    tags.insert_new(tag)?;
                    root_added |= tag == root;
                    if let Some(dirty) = dirty.as_deref_mut() {
                        dirty.mark_added(tag);
                    }

                    let present = *tags.present();
                    if let Some(rule) = rule {
                        for removed in rule.removed.intersection(&present).iter() {
                            self.enqueue(&mut queue, TagStep::Remove(removed));
                        }
                        for attached in rule.attached.difference(&present).iter() {
                            self.enqueue(&mut queue, TagStep::Add(attached));
                        }
                    }
                    for dependent in registry.dependents_of(tag).intersection(&present).iter() {
                        self.enqueue(&mut queue, TagStep::Remove(dependent));
                    }
                    if rule.is_some_and(|rule| rule.flags.contains(RuleFlags::HAS_REMOVE_IF)) {
                        self.enqueue(&mut queue, TagStep::RecheckRemoveIf(tag));
                    }
                }
                TagStep::Remove(tag) => {
                    self.remove_all(tags, tag, dirty.as_deref_mut());
                }
                TagStep::RecheckRemoveIf(tag) => {
                    let triggered = registry
                        .get(tag)
                        .is_some_and(|rule| rule.should_remove(tags.present()));
                    if triggered {
                        self.remove_all(tags, tag, dirty.as_deref_mut());
                    }
                }
            }
        }

        Ok(match (root_added, tags.contains(root)) {
            (true, true) => AddOutcome::Added,
            (true, false) => AddOutcome::Reverted,
            (false, _) if root_rejected => AddOutcome::Rejected,
            (false, _) => AddOutcome::Skipped,
        })
    }

    fn enqueue(
        &mut self,
        queue: &mut ArrayVec<TagStep, { EngineConfig::TRANSACTION_CAPACITY }>,
        step: TagStep,
    ) {
        if queue.try_push(step).is_err() {
            self.txn.note_dropped();
        }
    }

    /// Cascade removal clears every stack of the tag.
    fn remove_all(&mut self, tags: &mut EntityTags, tag: TagId, dirty: Option<&mut DirtyTags>) {
        if !tags.contains(tag) || !self.txn.try_mark_processed(tag, false) {
            return;
        }
        tags.clear_tag(tag);
        if let Some(dirty) = dirty {
            dirty.mark_removed(tag);
        }
    }

    /// Removes one stack. Never cascades.
    pub fn remove_tag(
        &mut self,
        tags: &mut EntityTags,
        tag: TagId,
        dirty: Option<&mut DirtyTags>,
    ) -> RemoveOutcome {
        if !tags.contains(tag) {
            return RemoveOutcome::NotPresent;
        }
        match tags.unstack(tag) {
            0 => {
                if let Some(dirty) = dirty {
                    dirty.mark_removed(tag);
                }
                RemoveOutcome::Removed
            }
            remaining => RemoveOutcome::Decremented(remaining),
        }
    }

    pub fn has_tag(&self, tags: &EntityTags, tag: TagId, sense: TagSense) -> bool {
        if !tags.contains(tag) {
            return false;
        }
        match sense {
            TagSense::Present => true,
            TagSense::Effective => !self
                .registry
                .get(tag)
                .is_some_and(|rule| rule.is_disabled(tags.present())),
        }
    }

    pub fn contains_all(&self, tags: &EntityTags, query: &TagSet, sense: TagSense) -> bool {
        match sense {
            TagSense::Present => tags.present().contains_all(query),
            TagSense::Effective => query.iter().all(|tag| self.has_tag(tags, tag, sense)),
        }
    }

    pub fn intersects(&self, tags: &EntityTags, query: &TagSet, sense: TagSense) -> bool {
        match sense {
            TagSense::Present => tags.present().intersects(query),
            TagSense::Effective => query.iter().any(|tag| self.has_tag(tags, tag, sense)),
        }
    }
}
