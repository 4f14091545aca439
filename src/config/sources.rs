//! Configuration sources, lowest precedence first.

use super::WORKSPACE_CONFIG_FILE;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use std::path::{Path, PathBuf};

pub(super) const ENV_PREFIX: &str = "SHADOWTREE";

/// `$XDG_CONFIG_HOME/shadowtree/config.toml` or the platform equivalent.
pub(super) fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "shadowtree", "shadowtree")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub(super) fn add_global_file(
    builder: ConfigBuilder<DefaultState>,
) -> ConfigBuilder<DefaultState> {
    match global_config_path() {
        Some(path) => builder.add_source(File::from(path).required(false)),
        None => builder,
    }
}

pub(super) fn add_workspace_file(
    builder: ConfigBuilder<DefaultState>,
    root: &Path,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(root.join(WORKSPACE_CONFIG_FILE)).required(false))
}

/// `SHADOWTREE__WATCH__QUEUE_CAPACITY=500` style overrides. List keys accept
/// comma-separated values.
pub(super) fn add_environment(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("tree.ignore_patterns")
            .with_list_parse_key("tree.hidden_names"),
    ))
}
