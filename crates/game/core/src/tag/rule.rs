use arrayvec::ArrayVec;
use bitflags::bitflags;

use super::{TagId, TagRuleError, TagSet};
use crate::config::EngineConfig;

type RuleList = ArrayVec<u16, { EngineConfig::MAX_RULE_LIST }>;

/// Declarative rule set for one tag, as authored in content.
///
/// Ids are kept raw until [`TagRuleRegistry::register`] validates them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TagRuleSet {
    /// Tags that must all be present before this tag can be added.
    pub required: RuleList,
    /// Tags whose presence prevents adding this tag.
    pub blocked: RuleList,
    /// Tags added alongside this tag.
    pub attached: RuleList,
    /// Tags removed when this tag is added.
    pub removed: RuleList,
    /// This tag is removed when any of these become present.
    pub remove_if: RuleList,
    /// This tag is present but ineffective while any of these are present.
    pub disabled_if: RuleList,
}

impl TagRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
            && self.blocked.is_empty()
            && self.attached.is_empty()
            && self.removed.is_empty()
            && self.remove_if.is_empty()
            && self.disabled_if.is_empty()
    }
}

bitflags! {
    /// Which masks of a compiled rule have any bits set.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct RuleFlags: u8 {
        const HAS_REQUIRED = 1 << 0;
        const HAS_BLOCKED = 1 << 1;
        const HAS_ATTACHED = 1 << 2;
        const HAS_REMOVED = 1 << 3;
        const HAS_REMOVE_IF = 1 << 4;
        const HAS_DISABLED_IF = 1 << 5;
    }
}

/// Bitmask form of a [`TagRuleSet`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TagRuleCompiled {
    pub required: TagSet,
    pub blocked: TagSet,
    pub attached: TagSet,
    pub removed: TagSet,
    pub remove_if: TagSet,
    pub disabled_if: TagSet,
    pub flags: RuleFlags,
}

impl TagRuleCompiled {
    fn compile(tag: TagId, rules: &TagRuleSet) -> Result<Self, TagRuleError> {
        let mask = |list: &RuleList, field: &'static str| -> Result<TagSet, TagRuleError> {
            list.iter()
                .map(|raw| TagId::from_raw(*raw, field))
                .collect::<Result<TagSet, _>>()
        };

        let compiled = Self {
            required: mask(&rules.required, "required")?,
            blocked: mask(&rules.blocked, "blocked")?,
            attached: mask(&rules.attached, "attached")?,
            removed: mask(&rules.removed, "removed")?,
            remove_if: mask(&rules.remove_if, "remove_if")?,
            disabled_if: mask(&rules.disabled_if, "disabled_if")?,
            flags: RuleFlags::empty(),
        };

        if compiled.blocked.contains(tag) {
            return Err(TagRuleError::SelfBlocking { tag });
        }
        if let Some(conflicting) = compiled.required.intersection(&compiled.blocked).iter().next() {
            return Err(TagRuleError::RequiredAndBlocked { tag, conflicting });
        }

        let mut flags = RuleFlags::empty();
        flags.set(RuleFlags::HAS_REQUIRED, !compiled.required.is_empty());
        flags.set(RuleFlags::HAS_BLOCKED, !compiled.blocked.is_empty());
        flags.set(RuleFlags::HAS_ATTACHED, !compiled.attached.is_empty());
        flags.set(RuleFlags::HAS_REMOVED, !compiled.removed.is_empty());
        flags.set(RuleFlags::HAS_REMOVE_IF, !compiled.remove_if.is_empty());
        flags.set(RuleFlags::HAS_DISABLED_IF, !compiled.disabled_if.is_empty());

        Ok(Self { flags, ..compiled })
    }

    /// Required ⊆ present and Blocked ∩ present = ∅.
    pub fn can_add(&self, present: &TagSet) -> bool {
        (!self.flags.contains(RuleFlags::HAS_REQUIRED) || present.contains_all(&self.required))
            && (!self.flags.contains(RuleFlags::HAS_BLOCKED) || !present.intersects(&self.blocked))
    }

    /// True while any DisabledIf tag is present.
    pub fn is_disabled(&self, present: &TagSet) -> bool {
        self.flags.contains(RuleFlags::HAS_DISABLED_IF) && present.intersects(&self.disabled_if)
    }

    /// True when any RemoveIf tag is present.
    pub fn should_remove(&self, present: &TagSet) -> bool {
        self.flags.contains(RuleFlags::HAS_REMOVE_IF) && present.intersects(&self.remove_if)
    }
}

/// Compiled rules for every tag, plus the inverse RemoveIf index.
///
/// Registered at load time and read-only afterwards.
#[derive(Clone, Debug)]
pub struct TagRuleRegistry {
    rules: [Option<TagRuleCompiled>; EngineConfig::MAX_TAGS],
    /// `remove_if_dependents[x]` = tags whose RemoveIf mask contains `x`.
    remove_if_dependents: [TagSet; EngineConfig::MAX_TAGS],
    registered: TagSet,
}

impl Default for TagRuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TagRuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: [None; EngineConfig::MAX_TAGS],
            remove_if_dependents: [TagSet::EMPTY; EngineConfig::MAX_TAGS],
            registered: TagSet::EMPTY,
        }
    }

    /// Compiles and stores the rule set for `raw_tag`, replacing any previous one.
    pub fn register(&mut self, raw_tag: u16, rules: &TagRuleSet) -> Result<TagId, TagRuleError> {
        let tag = TagId::from_raw(raw_tag, "tag")?;
        let compiled = TagRuleCompiled::compile(tag, rules)?;

        if let Some(previous) = self.rules[tag.index()].take() {
            tracing::warn!(%tag, "tag rule re-registered; previous rule replaced");
            for trigger in previous.remove_if.iter() {
                self.remove_if_dependents[trigger.index()].remove(tag);
            }
        }

        for trigger in compiled.remove_if.iter() {
            self.remove_if_dependents[trigger.index()].insert(tag);
        }
        self.rules[tag.index()] = Some(compiled);
        self.registered.insert(tag);
        Ok(tag)
    }

    #[inline]
    pub fn get(&self, tag: TagId) -> Option<&TagRuleCompiled> {
        self.rules[tag.index()].as_ref()
    }

    #[inline]
    pub fn has_rule(&self, tag: TagId) -> bool {
        self.registered.contains(tag)
    }

    /// Tags that must be re-checked for removal when `tag` becomes present.
    #[inline]
    pub fn dependents_of(&self, tag: TagId) -> &TagSet {
        &self.remove_if_dependents[tag.index()]
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(raw: u8) -> TagId {
        TagId::new(raw).unwrap()
    }

    fn list(ids: &[u16]) -> RuleList {
        ids.iter().copied().collect()
    }

    #[test]
    fn compiles_masks_and_flags() {
        let mut registry = TagRuleRegistry::new();
        let rules = TagRuleSet {
            required: list(&[2]),
            attached: list(&[3, 4]),
            remove_if: list(&[9]),
            ..TagRuleSet::default()
        };
        registry.register(1, &rules).unwrap();

        let compiled = registry.get(tag(1)).unwrap();
        assert!(compiled.flags.contains(RuleFlags::HAS_REQUIRED | RuleFlags::HAS_ATTACHED));
        assert!(!compiled.flags.contains(RuleFlags::HAS_BLOCKED));
        assert_eq!(compiled.attached.len(), 2);
        assert!(registry.dependents_of(tag(9)).contains(tag(1)));
        assert!(registry.has_rule(tag(1)));
        assert!(!registry.has_rule(tag(2)));
    }

    #[test]
    fn rejects_out_of_range_ids() {
        let mut registry = TagRuleRegistry::new();
        assert!(matches!(
            registry.register(0, &TagRuleSet::default()),
            Err(TagRuleError::InvalidTagId { raw: 0, field: "tag" })
        ));

        let rules = TagRuleSet {
            attached: list(&[300]),
            ..TagRuleSet::default()
        };
        assert_eq!(
            registry.register(5, &rules),
            Err(TagRuleError::InvalidTagId {
                raw: 300,
                field: "attached"
            })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_contradictory_rules() {
        let mut registry = TagRuleRegistry::new();
        let contradictory = TagRuleSet {
            required: list(&[7]),
            blocked: list(&[7]),
            ..TagRuleSet::default()
        };
        assert_eq!(
            registry.register(1, &contradictory),
            Err(TagRuleError::RequiredAndBlocked {
                tag: tag(1),
                conflicting: tag(7)
            })
        );

        let self_blocking = TagRuleSet {
            blocked: list(&[1]),
            ..TagRuleSet::default()
        };
        assert_eq!(
            registry.register(1, &self_blocking),
            Err(TagRuleError::SelfBlocking { tag: tag(1) })
        );
    }

    #[test]
    fn re_registration_replaces_inverse_index() {
        let mut registry = TagRuleRegistry::new();
        registry
            .register(1, &TagRuleSet { remove_if: list(&[9]), ..TagRuleSet::default() })
            .unwrap();
        registry
            .register(1, &TagRuleSet { remove_if: list(&[8]), ..TagRuleSet::default() })
            .unwrap();

        assert!(!registry.dependents_of(tag(9)).contains(tag(1)));
        assert!(registry.dependents_of(tag(8)).contains(tag(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn can_add_checks_required_and_blocked() {
        let compiled = TagRuleCompiled::compile(
            tag(1),
            &TagRuleSet {
                required: list(&[2]),
                blocked: list(&[3]),
                ..TagRuleSet::default()
            },
        )
        .unwrap();

        let mut present = TagSet::new();
        assert!(!compiled.can_add(&present));
        present.insert(tag(2));
        assert!(compiled.can_add(&present));
        present.insert(tag(3));
        assert!(!compiled.can_add(&present));
    }
}
