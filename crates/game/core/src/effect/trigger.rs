//! External expire conditions.
//!
//! Templates can name a condition by string key; the [`TriggerFactoryRegistry`]
//! turns key + parameters into a boxed [`ExpireTrigger`] once at load time and
//! the result is stored in [`ExpireConditions`]. The engine only ever holds the
//! resulting [`ExpireConditionId`].

use std::collections::BTreeMap;
use std::fmt;

use super::AttributeId;
use crate::clock::Tick;
use crate::env::{EntityHandle, EntityStore};
use crate::tag::TagId;

/// State an expire condition is evaluated against.
pub struct TriggerContext<'a> {
    pub world: &'a dyn EntityStore,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub stacks: u16,
    pub now: Tick,
}

/// Condition that ends a duration effect early.
pub trait ExpireTrigger: fmt::Debug {
    fn should_expire(&self, ctx: &TriggerContext<'_>) -> bool;
}

/// Static parameters handed to a trigger factory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TriggerParams {
    pub tag: Option<TagId>,
    pub attribute: Option<AttributeId>,
    pub threshold: i64,
}

/// Builds a trigger from parameters, or explains which parameter is missing.
pub type TriggerFactory =
    Box<dyn Fn(&TriggerParams) -> Result<Box<dyn ExpireTrigger>, &'static str>>;

/// Handle to an instantiated expire condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpireConditionId(pub u32);

/// Expires once the target no longer carries a tag.
#[derive(Clone, Copy, Debug)]
struct TargetLacksTag {
    tag: TagId,
}

impl ExpireTrigger for TargetLacksTag {
    fn should_expire(&self, ctx: &TriggerContext<'_>) -> bool {
        ctx.world
            .tags(ctx.target)
            .is_none_or(|tags| !tags.contains(self.tag))
    }
}

/// Expires once a target attribute drops below a threshold.
#[derive(Clone, Copy, Debug)]
struct AttributeBelow {
    attribute: AttributeId,
    threshold: i64,
}

impl ExpireTrigger for AttributeBelow {
    fn should_expire(&self, ctx: &TriggerContext<'_>) -> bool {
        ctx.world
            .attribute(ctx.target, self.attribute)
            .is_some_and(|value| value < self.threshold)
    }
}

/// String key → trigger factory.
#[derive(Default)]
pub struct TriggerFactoryRegistry {
    factories: BTreeMap<String, TriggerFactory>,
}

impl fmt::Debug for TriggerFactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerFactoryRegistry")
            .field("keys", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TriggerFactoryRegistry {
    pub const TARGET_LACKS_TAG: &'static str = "target_lacks_tag";
    pub const ATTRIBUTE_BELOW: &'static str = "attribute_below";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Self::TARGET_LACKS_TAG, |params| {
            let tag = params.tag.ok_or("target_lacks_tag needs `tag`")?;
            Ok(Box::new(TargetLacksTag { tag }))
        });
        registry.register(Self::ATTRIBUTE_BELOW, |params| {
            let attribute = params.attribute.ok_or("attribute_below needs `attribute`")?;
            Ok(Box::new(AttributeBelow {
                attribute,
                threshold: params.threshold,
            }))
        });
        registry
    }

    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(&TriggerParams) -> Result<Box<dyn ExpireTrigger>, &'static str> + 'static,
    {
        let key = key.into();
        if self.factories.contains_key(&key) {
            tracing::warn!(%key, "trigger factory re-registered");
        }
        self.factories.insert(key, Box::new(factory));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// `None` for unknown keys; `Some(Err)` when the factory rejects the parameters.
    pub fn create(
        &self,
        key: &str,
        params: &TriggerParams,
    ) -> Option<Result<Box<dyn ExpireTrigger>, &'static str>> {
        self.factories.get(key).map(|factory| factory(params))
    }
}

/// Instantiated expire conditions, addressed by [`ExpireConditionId`].
#[derive(Debug, Default)]
pub struct ExpireConditions {
    conditions: Vec<Box<dyn ExpireTrigger>>,
}

impl ExpireConditions {
    pub fn push(&mut self, condition: Box<dyn ExpireTrigger>) -> ExpireConditionId {
        self.conditions.push(condition);
        ExpireConditionId(self.conditions.len() as u32 - 1)
    }

    pub fn get(&self, id: ExpireConditionId) -> Option<&dyn ExpireTrigger> {
        self.conditions.get(id.0 as usize).map(|condition| condition.as_ref())
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }
}
