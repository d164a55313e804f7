//! Load-time catalogs bundled for the pipeline.
//!
//! [`Registries`] is filled once while content loads and then borrowed
//! read-only by [`crate::engine::EffectEngine`]. Template registration runs
//! every structural check up front so the pipeline never has to.

use crate::effect::{
    ComponentFlags, EffectPhase, EffectTemplate, EffectTemplateRegistry, ExpireConditionId,
    ExpireConditions, LifetimeKind, NativeHandlerId, PhaseHandler, PresetBehaviorRegistry,
    PresetId, PresetRegistry, TemplateId, TriggerFactoryRegistry, TriggerParams,
};
use crate::engine::NativeHandlerRegistry;
use crate::error::{CoreError, ErrorSeverity};
use crate::tag::{TagId, TagRuleError, TagRuleRegistry, TagRuleSet};

/// Content rejected at registration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("template id 0 is reserved as the listener wildcard")]
    ReservedTemplateId,

    #[error("template {template} references unknown {preset}")]
    UnknownPreset { template: TemplateId, preset: PresetId },

    #[error("template {template}: preset {preset} does not allow {kind} lifetimes")]
    LifetimeNotAllowed {
        template: TemplateId,
        preset: String,
        kind: LifetimeKind,
    },

    #[error("template {template}: preset {preset} requires components {missing:?}")]
    MissingComponents {
        template: TemplateId,
        preset: String,
        missing: ComponentFlags,
    },

    #[error("template {template}: preset {preset} does not allow components {disallowed:?}")]
    DisallowedComponents {
        template: TemplateId,
        preset: String,
        disallowed: ComponentFlags,
    },

    #[error("template {template}: after_ticks lifetime needs a non-zero duration")]
    InvalidDuration { template: TemplateId },

    #[error("template {template}: stack limit must be at least 1")]
    InvalidStackPolicy { template: TemplateId },

    #[error("template {template}: binding on {phase}, which its preset never runs")]
    BindingOnInactivePhase {
        template: TemplateId,
        phase: EffectPhase,
    },

    #[error("template {template}: main override on {phase} without skip_main")]
    MainWithoutSkip {
        template: TemplateId,
        phase: EffectPhase,
    },

    #[error("template {template}: {handler} is not registered")]
    UnknownNativeHandler {
        template: TemplateId,
        handler: NativeHandlerId,
    },

    #[error("template {template}: expire condition {} does not exist", condition.0)]
    UnknownExpireCondition {
        template: TemplateId,
        condition: ExpireConditionId,
    },

    #[error("unknown expire trigger `{0}`")]
    UnknownTrigger(String),

    #[error("expire trigger `{key}` rejected its parameters: {reason}")]
    InvalidTriggerParams { key: String, reason: &'static str },

    #[error(transparent)]
    TagRule(#[from] TagRuleError),
}

impl CoreError for RegistryError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Configuration
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ReservedTemplateId => "REGISTRY_RESERVED_TEMPLATE_ID",
            Self::UnknownPreset { .. } => "REGISTRY_UNKNOWN_PRESET",
            Self::LifetimeNotAllowed { .. } => "REGISTRY_LIFETIME_NOT_ALLOWED",
            Self::MissingComponents { .. } => "REGISTRY_MISSING_COMPONENTS",
            Self::DisallowedComponents { .. } => "REGISTRY_DISALLOWED_COMPONENTS",
            Self::InvalidDuration { .. } => "REGISTRY_INVALID_DURATION",
            Self::InvalidStackPolicy { .. } => "REGISTRY_INVALID_STACK_POLICY",
            Self::BindingOnInactivePhase { .. } => "REGISTRY_BINDING_ON_INACTIVE_PHASE",
            Self::MainWithoutSkip { .. } => "REGISTRY_MAIN_WITHOUT_SKIP",
            Self::UnknownNativeHandler { .. } => "REGISTRY_UNKNOWN_NATIVE_HANDLER",
            Self::UnknownExpireCondition { .. } => "REGISTRY_UNKNOWN_EXPIRE_CONDITION",
            Self::UnknownTrigger(_) => "REGISTRY_UNKNOWN_TRIGGER",
            Self::InvalidTriggerParams { .. } => "REGISTRY_INVALID_TRIGGER_PARAMS",
            Self::TagRule(e) => e.error_code(),
        }
    }
}

/// Every static catalog the pipeline reads.
#[derive(Debug)]
pub struct Registries {
    pub tags: TagRuleRegistry,
    pub presets: PresetRegistry,
    pub behaviors: PresetBehaviorRegistry,
    pub templates: EffectTemplateRegistry,
    pub natives: NativeHandlerRegistry,
    pub triggers: TriggerFactoryRegistry,
    pub expire_conditions: ExpireConditions,
}

impl Default for Registries {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Registries {
    /// Built-in presets, behaviors, native handlers and trigger factories;
    /// no tag rules or templates.
    pub fn with_builtins() -> Self {
        Self {
            tags: TagRuleRegistry::new(),
            presets: PresetRegistry::with_builtins(),
            behaviors: PresetBehaviorRegistry::with_builtins(),
            templates: EffectTemplateRegistry::new(),
            natives: NativeHandlerRegistry::with_builtins(),
            triggers: TriggerFactoryRegistry::with_builtins(),
            expire_conditions: ExpireConditions::default(),
        }
    }

    pub fn register_tag_rule(&mut self, raw_tag: u16, rules: &TagRuleSet) -> Result<TagId, RegistryError> {
        Ok(self.tags.register(raw_tag, rules)?)
    }

    /// Builds an expire condition from a trigger key and stores it.
    pub fn instantiate_trigger(
        &mut self,
        key: &str,
        params: &TriggerParams,
    ) -> Result<ExpireConditionId, RegistryError> {
        let trigger = self
            .triggers
            .create(key, params)
            .ok_or_else(|| RegistryError::UnknownTrigger(key.to_owned()))?
            .map_err(|reason| RegistryError::InvalidTriggerParams {
                key: key.to_owned(),
                reason,
            })?;
        Ok(self.expire_conditions.push(trigger))
    }

    /// Validates a template against its preset and stores it.
    pub fn register_template(&mut self, template: EffectTemplate) -> Result<(), RegistryError> {
        self.validate_template(&template)?;
        self.templates.insert(template);
        Ok(())
    }

    pub fn validate_template(&self, template: &EffectTemplate) -> Result<(), RegistryError> {
        let id = template.id;
        if id.is_wildcard() {
            return Err(RegistryError::ReservedTemplateId);
        }
        let preset = self.presets.get(template.preset).ok_or(RegistryError::UnknownPreset {
            template: id,
            preset: template.preset,
        })?;

        let kind = template.lifetime.kind;
        if !preset.lifetimes.allows(kind) {
            return Err(RegistryError::LifetimeNotAllowed {
                template: id,
                preset: preset.name.clone(),
                kind,
            });
        }
        if kind == LifetimeKind::AfterTicks && template.lifetime.duration_ticks == 0 {
            return Err(RegistryError::InvalidDuration { template: id });
        }

        let components = template.components();
        let missing = preset.required.difference(components);
        if !missing.is_empty() {
            return Err(RegistryError::MissingComponents {
                template: id,
                preset: preset.name.clone(),
                missing,
            });
        }
        let disallowed = components.difference(preset.allowed);
        if !disallowed.is_empty() {
            return Err(RegistryError::DisallowedComponents {
                template: id,
                preset: preset.name.clone(),
                disallowed,
            });
        }
        if template.stack.is_some_and(|stack| stack.limit == 0) {
            return Err(RegistryError::InvalidStackPolicy { template: id });
        }

        for (phase, binding) in template.bindings.bound() {
            if !preset.active_phases.has(phase) {
                return Err(RegistryError::BindingOnInactivePhase { template: id, phase });
            }
            if binding.main.is_some() && !binding.skip_main {
                return Err(RegistryError::MainWithoutSkip { template: id, phase });
            }
            for handler in binding.handlers() {
                if let PhaseHandler::Native(handler) = handler
                    && !self.natives.contains(handler)
                {
                    return Err(RegistryError::UnknownNativeHandler { template: id, handler });
                }
            }
        }

        if let Some(condition) = template.expire_condition
            && self.expire_conditions.get(condition).is_none()
        {
            return Err(RegistryError::UnknownExpireCondition { template: id, condition });
        }
        Ok(())
    }

    /// Drops all content, keeping the built-ins.
    pub fn clear(&mut self) {
        self.tags.clear();
        self.templates.clear();
        self.expire_conditions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockDomain;
    use crate::effect::{
        AttributeId, AttributeModifier, EffectLifetime, PhaseBinding, StackPolicy,
    };
    use crate::env::ProgramId;

    fn dot(id: u32) -> EffectTemplate {
        EffectTemplate::new(
            TemplateId(id),
            PresetId::DOT,
            EffectLifetime::after_ticks(ClockDomain::FixedFrame, 3).with_period(1),
        )
        .with_modifier(AttributeModifier::add(AttributeId(0), -2))
    }

    #[test]
    fn accepts_well_formed_templates() {
        let mut registries = Registries::with_builtins();
        registries.register_template(dot(1)).unwrap();
        assert!(registries.templates.contains(TemplateId(1)));
    }

    #[test]
    fn rejects_preset_mismatches() {
        let registries = Registries::with_builtins();

        let instant_dot = EffectTemplate::new(TemplateId(2), PresetId::DOT, EffectLifetime::instant())
            .with_modifier(AttributeModifier::add(AttributeId(0), -2));
        assert!(matches!(
            registries.validate_template(&instant_dot),
            Err(RegistryError::LifetimeNotAllowed { .. })
        ));

        let no_period = EffectTemplate::new(
            TemplateId(3),
            PresetId::DOT,
            EffectLifetime::after_ticks(ClockDomain::FixedFrame, 3),
        )
        .with_modifier(AttributeModifier::add(AttributeId(0), -2));
        assert!(matches!(
            registries.validate_template(&no_period),
            Err(RegistryError::MissingComponents { missing, .. }) if missing == ComponentFlags::PERIOD
        ));

        let zero_stack = dot(4).with_stack(StackPolicy::new(
            0,
            Default::default(),
            Default::default(),
        ));
        assert_eq!(
            registries.validate_template(&zero_stack),
            Err(RegistryError::InvalidStackPolicy { template: TemplateId(4) })
        );

        assert_eq!(
            registries.validate_template(&dot(0)),
            Err(RegistryError::ReservedTemplateId)
        );
    }

    #[test]
    fn rejects_bad_bindings() {
        let registries = Registries::with_builtins();
        let graph = PhaseHandler::Graph(ProgramId(1));

        let inactive = dot(5).with_binding(
            EffectPhase::Hit,
            PhaseBinding {
                pre: Some(graph),
                ..PhaseBinding::default()
            },
        );
        assert!(matches!(
            registries.validate_template(&inactive),
            Err(RegistryError::BindingOnInactivePhase { phase: EffectPhase::Hit, .. })
        ));

        let no_skip = dot(6).with_binding(
            EffectPhase::Period,
            PhaseBinding {
                main: Some(graph),
                ..PhaseBinding::default()
            },
        );
        assert!(matches!(
            registries.validate_template(&no_skip),
            Err(RegistryError::MainWithoutSkip { .. })
        ));

        let unknown_native = dot(7).with_binding(
            EffectPhase::Period,
            PhaseBinding {
                post: Some(PhaseHandler::Native(NativeHandlerId(200))),
                ..PhaseBinding::default()
            },
        );
        assert!(matches!(
            registries.validate_template(&unknown_native),
            Err(RegistryError::UnknownNativeHandler { .. })
        ));
    }

    #[test]
    fn triggers_resolve_by_key() {
        let mut registries = Registries::with_builtins();
        assert!(matches!(
            registries.instantiate_trigger("on_full_moon", &TriggerParams::default()),
            Err(RegistryError::UnknownTrigger(_))
        ));
        let err = registries
            .instantiate_trigger(TriggerFactoryRegistry::ATTRIBUTE_BELOW, &TriggerParams::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "REGISTRY_INVALID_TRIGGER_PARAMS");

        let params = TriggerParams {
            attribute: Some(AttributeId(0)),
            threshold: 1,
            ..TriggerParams::default()
        };
        let condition = registries
            .instantiate_trigger(TriggerFactoryRegistry::ATTRIBUTE_BELOW, &params)
            .unwrap();
        registries
            .register_template(dot(8).with_expire_condition(condition))
            .unwrap();
        assert!(
            registries
                .validate_template(&dot(9).with_expire_condition(ExpireConditionId(42)))
                .is_err()
        );
    }
}
