//! Scroll configuration loader.

use std::path::Path;

use scroll_core::ScrollConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for scroll configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate config from a TOML file.
    ///
    /// Missing keys fall back to [`ScrollConfig::default`].
    pub fn load(path: &Path) -> LoadResult<ScrollConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<ScrollConfig> {
        let config: ScrollConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid scroll config: {}", e))?;
        Ok(config)
    }
}
