//! Configuration for the tree filter, the watchers, and logging.
//!
//! Every field has a serde default, so an empty or missing file yields
//! [`SyncConfig::default`]. See [`ConfigLoader`] for the source layering.

mod facade;
mod sources;

pub use facade::ConfigLoader;

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// File name of the per-root configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = ".shadowtree.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "watch.queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.watch.max_path_len == 0 {
            return Err(ConfigError::Invalid(
                "watch.max_path_len must be greater than zero".to_string(),
            ));
        }
        if self.tree.hidden_names.iter().any(|name| name.contains(['/', '\\'])) {
            return Err(ConfigError::Invalid(
                "tree.hidden_names entries must be bare file names".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which disk entries the tree mirrors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Show non-member items.
    #[serde(default)]
    pub show_all_files: bool,

    /// Entry names never included, wherever they appear.
    #[serde(default = "default_hidden_names")]
    pub hidden_names: Vec<String>,

    /// Glob-like patterns matched against root-relative paths.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Include dotfiles and dot-directories.
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_hidden_names() -> Vec<String> {
    [".git", ".hg", ".svn", WORKSPACE_CONFIG_FILE]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            show_all_files: false,
            hidden_names: default_hidden_names(),
            ignore_patterns: Vec::new(),
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Register OS watchers at all; when false the tree only changes on
    /// explicit rescans.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Pending records beyond this count trigger a full rescan.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Longer paths are dropped from the queue.
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_max_path_len() -> usize {
    4096
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: default_queue_capacity(),
            max_path_len: default_max_path_len(),
        }
    }
}
