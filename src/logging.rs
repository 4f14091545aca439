//! Logging setup
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`] once
//! to install a subscriber configured from [`LoggingConfig`], with
//! `SHADOWTREE_LOG*` environment variables taking precedence.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const ENV_FILTER: &str = "SHADOWTREE_LOG";
const ENV_FORMAT: &str = "SHADOWTREE_LOG_FORMAT";
const ENV_OUTPUT: &str = "SHADOWTREE_LOG_OUTPUT";
const ENV_FILE: &str = "SHADOWTREE_LOG_FILE";

/// Resolve the log file path: explicit argument, then `SHADOWTREE_LOG_FILE`,
/// then the configured file, then a per-root file in the state directory.
pub fn resolve_log_file_path(
    explicit: Option<PathBuf>,
    configured: Option<PathBuf>,
    root: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    if let Ok(env_path) = std::env::var(ENV_FILE) {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    default_log_file_path(root)
}

fn default_log_file_path(root: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let project_dirs = directories::ProjectDirs::from("", "shadowtree", "shadowtree")
        .ok_or_else(|| ConfigError::Invalid("could not determine the state directory".into()))?;
    let mut dir = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.data_local_dir())
        .to_path_buf();
    if let Some(root) = root {
        let canonical = dunce::canonicalize(root).map_err(|e| {
            ConfigError::Invalid(format!("failed to canonicalize {}: {}", root.display(), e))
        })?;
        for component in canonical.components() {
            if let std::path::Component::Normal(name) = component {
                dir.push(name);
            }
        }
    }
    Ok(dir.join("shadowtree.log"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// trace, debug, info, warn, error or off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// stdout, stderr, file, file+stderr or both
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Colored text output on terminals
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `shadowtree::sync = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: true,
            modules: HashMap::new(),
        }
    }
}

/// Install the global subscriber.
///
/// `root` scopes the default log file when the output includes a file.
pub fn init_logging(config: &LoggingConfig, root: Option<&Path>) -> Result<(), ConfigError> {
    if !config.enabled {
        Registry::default().with(EnvFilter::new("off")).init();
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let json = determine_format(config)? == LogFormat::Json;
    let output = determine_output(config)?;
    let ansi = config.color && !output.file;

    let writer = match (output.file, output.stdout, output.stderr) {
        (true, _, true) => {
            BoxMakeWriter::new(Mutex::new(open_log_file(config, root)?).and(std::io::stderr))
        }
        (true, _, false) => BoxMakeWriter::new(Mutex::new(open_log_file(config, root)?)),
        (false, true, true) => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        (false, true, false) => BoxMakeWriter::new(std::io::stdout),
        (false, false, _) => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);
    let subscriber = Registry::default().with(filter);
    let result = if json {
        subscriber.with(layer.json()).try_init()
    } else {
        subscriber.with(layer.with_ansi(ansi)).try_init()
    };
    result.map_err(|e| ConfigError::Invalid(format!("failed to install subscriber: {}", e)))
}

fn open_log_file(config: &LoggingConfig, root: Option<&Path>) -> Result<std::fs::File, ConfigError> {
    let log_file = resolve_log_file_path(None, config.file.clone(), root)?;
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| ConfigError::Invalid(format!("failed to open {}: {}", log_file.display(), e)))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_FILTER) {
        return Ok(filter);
    }
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.modules {
        let directive = format!("{}={}", module, level)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid log directive: {}", e)))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

#[derive(Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn determine_format(config: &LoggingConfig) -> Result<LogFormat, ConfigError> {
    let from_env = std::env::var(ENV_FORMAT).ok();
    parse_format(from_env.as_deref().unwrap_or(&config.format))
}

fn parse_format(format: &str) -> Result<LogFormat, ConfigError> {
    match format {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::Invalid(format!(
            "invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

#[derive(Debug)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

fn determine_output(config: &LoggingConfig) -> Result<OutputDestinations, ConfigError> {
    let from_env = std::env::var(ENV_OUTPUT).ok();
    parse_output_destinations(from_env.as_deref().unwrap_or(&config.output))
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, ConfigError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        "both" => (true, true, false),
        other => {
            return Err(ConfigError::Invalid(format!(
                "invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                other
            )))
        }
    };
    Ok(OutputDestinations {
        stdout,
        stderr,
        file,
    })
}
