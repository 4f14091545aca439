//! ConfigLoader: composes the configuration sources and validates the result.

use super::sources;
use super::SyncConfig;
use crate::error::ConfigError;
use config::Config;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a watched root.
    ///
    /// Precedence: defaults (lowest) -> global file -> `<root>/.shadowtree.toml`
    /// -> environment (highest).
    pub fn load(root: &Path) -> Result<SyncConfig, ConfigError> {
        let builder = sources::add_global_file(Config::builder());
        let builder = sources::add_workspace_file(builder, root);
        let builder = sources::add_environment(builder)?;
        Self::finish(builder.build()?)
    }

    /// Load a specific file with the environment overlay.
    pub fn load_from_file(path: &Path) -> Result<SyncConfig, ConfigError> {
        let builder = Config::builder().add_source(config::File::from(path));
        let builder = sources::add_environment(builder)?;
        Self::finish(builder.build()?)
    }

    fn finish(config: Config) -> Result<SyncConfig, ConfigError> {
        let config: SyncConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
