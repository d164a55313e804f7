//! Tag rule loader.
//!
//! Loads tag rule sets from RON files into the registries' tag rule table.

use std::path::Path;

use gameplay_core::{EngineConfig, Registries, TagRuleSet};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Rule set for one tag as written in data files.
///
/// Every list names raw tag ids; each holds at most
/// [`EngineConfig::MAX_RULE_LIST`] entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagRuleSpec {
    pub tag: u16,
    pub required: Vec<u16>,
    pub blocked: Vec<u16>,
    pub attached: Vec<u16>,
    pub removed: Vec<u16>,
    pub remove_if: Vec<u16>,
    pub disabled_if: Vec<u16>,
}

impl TagRuleSpec {
    /// Converts to the fixed-capacity core form.
    pub fn to_rules(&self) -> LoadResult<TagRuleSet> {
        let mut rules = TagRuleSet::default();
        for (field, values, list) in [
            ("required", &self.required, &mut rules.required),
            ("blocked", &self.blocked, &mut rules.blocked),
            ("attached", &self.attached, &mut rules.attached),
            ("removed", &self.removed, &mut rules.removed),
            ("remove_if", &self.remove_if, &mut rules.remove_if),
            ("disabled_if", &self.disabled_if, &mut rules.disabled_if),
        ] {
            if values.len() > EngineConfig::MAX_RULE_LIST {
                anyhow::bail!(
                    "tag {}: `{}` lists {} tags, at most {} allowed",
                    self.tag,
                    field,
                    values.len(),
                    EngineConfig::MAX_RULE_LIST
                );
            }
            list.extend(values.iter().copied());
        }
        Ok(rules)
    }
}

/// Loader for tag rule sets from RON files.
pub struct TagRuleLoader;

impl TagRuleLoader {
    /// Load tag rules from a RON file into `registries`.
    ///
    /// RON format: Vec<TagRuleSpec>
    ///
    /// Returns the number of rule sets registered.
    pub fn load(path: &Path, registries: &mut Registries) -> LoadResult<usize> {
        let content = read_file(path)?;
        Self::parse(&content, registries)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
    }

    /// Parse tag rules from RON text into `registries`.
    pub fn parse(content: &str, registries: &mut Registries) -> LoadResult<usize> {
        let specs: Vec<TagRuleSpec> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse tag rule RON: {}", e))?;

        for spec in &specs {
            let rules = spec.to_rules()?;
            registries
                .register_tag_rule(spec.tag, &rules)
                .map_err(|e| anyhow::anyhow!("Failed to register rules for tag {}: {}", spec.tag, e))?;
        }
        tracing::debug!(count = specs.len(), "tag rules loaded");
        Ok(specs.len())
    }
}
