//! Content factory for building registries from data files.

use std::path::{Path, PathBuf};

use gameplay_core::{EngineConfig, Registries};

use crate::loaders::{ConfigLoader, LoadResult, TagRuleLoader, TemplateLoader};

/// Content factory that loads all engine content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── tags.ron
/// └── templates.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Factory over the sample data shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    /// Load engine budgets from `config.toml`.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        ConfigLoader::load(&self.data_dir.join("config.toml"))
    }

    /// Built-in registries plus `tags.ron` and `templates.ron`.
    ///
    /// Tag rules load first so template validation sees them.
    pub fn load_registries(&self) -> LoadResult<Registries> {
        let mut registries = Registries::with_builtins();
        let tags = TagRuleLoader::load(&self.data_dir.join("tags.ron"), &mut registries)?;
        let templates =
            TemplateLoader::load(&self.data_dir.join("templates.ron"), &mut registries)?;
        tracing::info!(
            data_dir = %self.data_dir.display(),
            tags,
            templates,
            "content loaded"
        );
        Ok(registries)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
