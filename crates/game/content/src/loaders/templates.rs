//! Effect template loader.
//!
//! Templates name their preset, native handlers and expire triggers by string
//! key; the loader resolves every key against the registries and hands the
//! result to [`Registries::register_template`] for preset validation.

use std::path::Path;

use gameplay_core::effect::{SpawnDescriptor, TriggerParams};
use gameplay_core::{
    AttributeModifier, EffectLifetime, EffectPhase, EffectTemplate, EngineConfig, GrantedTag,
    PhaseBinding, PhaseHandler, ProgramId, Registries, StackPolicy, TagId, TargetingDescriptor,
    TemplateId,
};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Handler reference as written in data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerSpec {
    /// Registered native handler name.
    Native(String),
    /// Graph program id.
    Graph(u32),
}

/// Pre/Main/Post handlers for one phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSpec {
    pub phase: EffectPhase,
    #[serde(default)]
    pub pre: Option<HandlerSpec>,
    #[serde(default)]
    pub main: Option<HandlerSpec>,
    #[serde(default)]
    pub post: Option<HandlerSpec>,
    #[serde(default)]
    pub skip_main: bool,
}

/// Expire trigger key plus its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpireConditionSpec {
    pub key: String,
    #[serde(default)]
    pub params: TriggerParams,
}

/// Effect template as written in data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectTemplateSpec {
    pub id: u32,
    /// Preset name, e.g. `"dot"`.
    pub preset: String,
    #[serde(default)]
    pub lifetime: EffectLifetime,
    #[serde(default)]
    pub modifiers: Vec<AttributeModifier>,
    #[serde(default)]
    pub granted_tags: Vec<GrantedTag>,
    #[serde(default)]
    pub targeting: TargetingDescriptor,
    #[serde(default)]
    pub bindings: Vec<BindingSpec>,
    #[serde(default)]
    pub stack: Option<StackPolicy>,
    #[serde(default)]
    pub event_tag: Option<TagId>,
    #[serde(default = "participates")]
    pub response_chain: bool,
    #[serde(default)]
    pub expire_condition: Option<ExpireConditionSpec>,
    #[serde(default)]
    pub spawn: Option<SpawnDescriptor>,
}

fn participates() -> bool {
    true
}

impl EffectTemplateSpec {
    /// Resolves names against `registries`.
    ///
    /// Instantiating an expire condition stores it in `registries` even if a
    /// later check fails.
    pub fn build(&self, registries: &mut Registries) -> LoadResult<EffectTemplate> {
        let id = self.id;
        let preset = registries
            .presets
            .find(&self.preset)
            .ok_or_else(|| anyhow::anyhow!("template {}: unknown preset '{}'", id, self.preset))?;

        if self.modifiers.len() > EngineConfig::MAX_MODIFIERS {
            anyhow::bail!(
                "template {}: {} modifiers, at most {} allowed",
                id,
                self.modifiers.len(),
                EngineConfig::MAX_MODIFIERS
            );
        }
        if self.granted_tags.len() > EngineConfig::MAX_GRANTED_TAGS {
            anyhow::bail!(
                "template {}: {} granted tags, at most {} allowed",
                id,
                self.granted_tags.len(),
                EngineConfig::MAX_GRANTED_TAGS
            );
        }

        let mut template = EffectTemplate::new(TemplateId(id), preset, self.lifetime)
            .with_targeting(self.targeting)
            .with_response_chain(self.response_chain);
        template.modifiers.extend(self.modifiers.iter().copied());
        template.granted_tags.extend(self.granted_tags.iter().copied());
        if let Some(stack) = self.stack {
            template = template.with_stack(stack);
        }
        if let Some(tag) = self.event_tag {
            template = template.with_event_tag(tag);
        }
        if let Some(spawn) = self.spawn {
            template = template.with_spawn(spawn);
        }

        for binding in &self.bindings {
            let resolve = |slot: &Option<HandlerSpec>| -> LoadResult<Option<PhaseHandler>> {
                match slot {
                    None => Ok(None),
                    Some(HandlerSpec::Graph(program)) => {
                        Ok(Some(PhaseHandler::Graph(ProgramId(*program))))
                    }
                    Some(HandlerSpec::Native(name)) => registries
                        .natives
                        .find(name)
                        .map(|handler| Some(PhaseHandler::Native(handler)))
                        .ok_or_else(|| {
                            anyhow::anyhow!("template {}: unknown native handler '{}'", id, name)
                        }),
                }
            };
            template = template.with_binding(
                binding.phase,
                PhaseBinding {
                    pre: resolve(&binding.pre)?,
                    main: resolve(&binding.main)?,
                    post: resolve(&binding.post)?,
                    skip_main: binding.skip_main,
                },
            );
        }

        if let Some(expire) = &self.expire_condition {
            let condition = registries
                .instantiate_trigger(&expire.key, &expire.params)
                .map_err(|e| anyhow::anyhow!("template {}: {}", id, e))?;
            template = template.with_expire_condition(condition);
        }

        Ok(template)
    }
}

/// Loader for effect templates from RON files.
pub struct TemplateLoader;

impl TemplateLoader {
    /// Load templates from a RON file into `registries`.
    ///
    /// RON format: Vec<EffectTemplateSpec>
    ///
    /// Returns the number of templates registered.
    pub fn load(path: &Path, registries: &mut Registries) -> LoadResult<usize> {
        let content = read_file(path)?;
        Self::parse(&content, registries)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
    }

    /// Parse templates from RON text into `registries`.
    ///
    /// An id that is already registered is an error; earlier templates in
    /// the same text stay registered.
    pub fn parse(content: &str, registries: &mut Registries) -> LoadResult<usize> {
        let specs: Vec<EffectTemplateSpec> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse template RON: {}", e))?;

        for spec in &specs {
            if registries.templates.contains(TemplateId(spec.id)) {
                anyhow::bail!("template {}: id already registered", spec.id);
            }
            let template = spec.build(registries)?;
            registries
                .register_template(template)
                .map_err(|e| anyhow::anyhow!("Invalid template: {}", e))?;
        }
        tracing::debug!(count = specs.len(), "effect templates loaded");
        Ok(specs.len())
    }
}
