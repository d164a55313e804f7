//! Data-driven content for the gameplay engine.
//!
//! This crate turns data files into the load-time catalogs `gameplay-core`
//! runs on:
//! - Tag rule sets (data-driven via RON)
//! - Effect templates (data-driven via RON)
//! - Engine budgets (data-driven via TOML)
//!
//! Everything is resolved and validated here, so a name typo or a template
//! that breaks its preset's rules fails at load rather than mid-frame.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    BindingSpec, ConfigLoader, ContentFactory, EffectTemplateSpec, ExpireConditionSpec,
    HandlerSpec, LoadResult, TagRuleLoader, TagRuleSpec, TemplateLoader,
};
