//! Engine configuration loader.

use std::path::Path;

use gameplay_core::EngineConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for per-frame budgets from TOML files.
///
/// Missing keys keep their [`EngineConfig::default`] values.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
    }

    /// Parse config data from TOML text.
    pub fn parse(content: &str) -> LoadResult<EngineConfig> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        if config.max_requests_per_frame == 0 {
            anyhow::bail!("max_requests_per_frame must be at least 1");
        }
        tracing::debug!(?config, "engine config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_keep_defaults() {
        let config = ConfigLoader::parse("max_root_depth = 3\nmax_root_creations = 16\n").unwrap();
        assert_eq!(config.max_root_depth, 3);
        assert_eq!(config.max_root_creations, 16);
        assert_eq!(config.max_steps_per_frame, EngineConfig::DEFAULT_MAX_STEPS);
    }

    #[test]
    fn rejects_a_zero_request_cap() {
        assert!(ConfigLoader::parse("max_requests_per_frame = 0").is_err());
        assert!(ConfigLoader::parse("max_root_depth = \"deep\"").is_err());
    }
}
