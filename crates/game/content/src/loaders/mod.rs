//! Content loaders for reading engine data from files.
//!
//! Each loader has a `parse` entry point over text and a `load` entry point
//! over a path; [`ContentFactory`] wires them to a data directory.

pub mod config;
pub mod factory;
pub mod tags;
pub mod templates;

pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use tags::{TagRuleLoader, TagRuleSpec};
pub use templates::{
    BindingSpec, EffectTemplateSpec, ExpireConditionSpec, HandlerSpec, TemplateLoader,
};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
