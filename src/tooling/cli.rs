//! CLI Tooling
//!
//! Command-line front end: one-shot scans, status summaries, and a live
//! watch loop driving the engine's idle ticks.

use crate::config::{ConfigLoader, SyncConfig};
use crate::error::SyncError;
use crate::fs::{read_members_file, FsProjectHost, PathFilter};
use crate::host::{HierarchyListener, NodeProperty, ProjectHost};
use crate::logging::LoggingConfig;
use crate::sync::{IdleOutcome, SyncEngine};
use crate::tree::TreeSnapshot;
use crate::types::{NodeId, NodeKind};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Shadowtree - keep an in-memory project tree in sync with disk
#[derive(Parser)]
#[command(name = "shadowtree")]
#[command(about = "Mirror a directory as an ordered project tree and keep it in sync")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Root directory to mirror
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge the whole root once and print the tree
    Scan {
        /// Include non-member items
        #[arg(long)]
        show_all: bool,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// File listing member paths relative to the root, one per line
        #[arg(long)]
        members: Option<PathBuf>,
    },
    /// Merge the whole root once and print a summary
    Status {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        #[arg(long)]
        members: Option<PathBuf>,
    },
    /// Watch the root and print changes as they are reconciled
    Watch {
        #[arg(long)]
        show_all: bool,
        #[arg(long)]
        members: Option<PathBuf>,
        /// Units of work per idle tick
        #[arg(long, default_value = "64")]
        idle_budget: usize,
        /// Stop after this many seconds (default: run until killed)
        #[arg(long)]
        duration_secs: Option<u64>,
    },
}

/// Counts notifications; paths are resolved by diffing snapshots instead.
#[derive(Debug, Default, Clone)]
pub struct NotificationCounter {
    pub added: usize,
    pub deleted: usize,
    pub invalidated: usize,
    pub property_changes: usize,
    pub missing_members: usize,
    pub merges: usize,
}

impl HierarchyListener for NotificationCounter {
    fn item_added(&mut self, _parent: NodeId, _node: NodeId, _previous_visible: Option<NodeId>) {
        self.added += 1;
    }

    fn item_deleted(&mut self, _node: NodeId) {
        self.deleted += 1;
    }

    fn items_invalidated(&mut self, _node: NodeId) {
        self.invalidated += 1;
    }

    fn property_changed(&mut self, _node: NodeId, _property: NodeProperty) {
        self.property_changes += 1;
    }

    fn member_missing(&mut self, _node: NodeId) {
        self.missing_members += 1;
    }

    fn merge_completed(&mut self) {
        self.merges += 1;
    }
}

type CliEngine = SyncEngine<FsProjectHost, NotificationCounter>;

pub struct CliContext {
    root: PathBuf,
    config: SyncConfig,
    color: bool,
}

impl CliContext {
    pub fn new(root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, SyncError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&root)?,
        };
        let color = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
        Ok(Self {
            root,
            config,
            color,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Logging configuration with command-line overrides applied.
    pub fn logging_config(&self, cli: &Cli) -> LoggingConfig {
        let mut logging = self.config.logging.clone();
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &cli.log_file {
            logging.file = Some(file.clone());
        }
        logging
    }

    pub fn execute(&self, command: &Commands) -> Result<String, SyncError> {
        match command {
            Commands::Scan {
                show_all,
                format,
                members,
            } => {
                let mut engine = self.engine(*show_all, false)?;
                self.initial_sync(&mut engine, members.as_deref())?;
                let snapshot = engine.tree().snapshot();
                match format {
                    OutputFormat::Json => to_json(&snapshot),
                    OutputFormat::Text => Ok(self.format_tree(&snapshot)),
                }
            }
            Commands::Status { format, members } => {
                let mut engine = self.engine(false, false)?;
                let outcome = self.initial_sync(&mut engine, members.as_deref())?;
                match format {
                    OutputFormat::Json => to_json(&engine.status()),
                    OutputFormat::Text => Ok(format_status(&engine, &outcome)),
                }
            }
            Commands::Watch {
                show_all,
                members,
                idle_budget,
                duration_secs,
            } => self.watch(
                *show_all,
                members.as_deref(),
                (*idle_budget).max(1),
                duration_secs.map(Duration::from_secs),
            ),
        }
    }

    fn engine(&self, show_all: bool, watch: bool) -> Result<CliEngine, SyncError> {
        let mut config = self.config.clone();
        config.tree.show_all_files |= show_all;
        config.watch.enabled &= watch;
        let root = dunce::canonicalize(&self.root)
            .map_err(|_| SyncError::PathNotFound(self.root.clone()))?;
        let host = FsProjectHost::new(PathFilter::new(&root, &config.tree));
        SyncEngine::new(&root, host, NotificationCounter::default(), config)
    }

    /// Register members, merge everything, then add members missing on disk.
    fn initial_sync(
        &self,
        engine: &mut CliEngine,
        members: Option<&Path>,
    ) -> Result<IdleOutcome, SyncError> {
        let member_paths = match members {
            Some(file) => read_members_file(engine.root_path(), file)?,
            None => Vec::new(),
        };
        for path in &member_paths {
            engine.host_mut().add_member(path);
        }

        let outcome = engine.sync_now()?;

        // Promotes the folders above each member; members absent from disk
        // get a node of their own.
        for path in &member_paths {
            let existing = engine
                .tree()
                .find_by_path(path)
                .and_then(|id| engine.tree().get(id))
                .map(|node| node.kind());
            let kind = match existing {
                Some(kind) => kind,
                None if path.is_dir() => NodeKind::Directory,
                None => NodeKind::File,
            };
            engine.add_member(path, kind)?;
        }
        info!(
            members = engine.host().member_count(),
            units = outcome.units,
            "initial sync finished"
        );
        Ok(outcome)
    }

    fn watch(
        &self,
        show_all: bool,
        members: Option<&Path>,
        idle_budget: usize,
        duration: Option<Duration>,
    ) -> Result<String, SyncError> {
        let mut engine = self.engine(show_all, true)?;
        let (tx, rx) = mpsc::channel::<()>();
        let tx = Mutex::new(tx);
        engine.set_waker(Arc::new(move || {
            let _ = tx.lock().send(());
        }));
        engine.set_attached(true);

        self.initial_sync(&mut engine, members)?;
        println!(
            "Watching {} ({} nodes)",
            engine.root_path().display(),
            engine.tree().node_count()
        );

        let deadline = duration.map(|d| Instant::now() + d);
        let poll = Duration::from_millis(500);
        let mut previous = visible_paths(&engine.tree().snapshot());
        let mut work_remaining = false;

        loop {
            let wait = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        break;
                    }
                    left.min(poll)
                }
                None => poll,
            };
            if !work_remaining {
                match rx.recv_timeout(wait) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Timeout) => {}
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }

            let mut budget = idle_budget;
            let outcome = engine.on_idle(|| {
                budget = budget.saturating_sub(1);
                budget > 0
            });
            work_remaining = outcome.work_remaining;
            if outcome.closed {
                break;
            }
            if outcome.units == 0 {
                continue;
            }

            let current = visible_paths(&engine.tree().snapshot());
            for path in current.difference(&previous) {
                println!("{} {}", self.paint_added("+"), path.display());
            }
            for path in previous.difference(&current) {
                println!("{} {}", self.paint_removed("-"), path.display());
            }
            previous = current;
        }

        engine.close();
        let counter = engine.listener();
        Ok(format!(
            "Stopped after {} idle ticks: {} added, {} deleted, {} merges",
            engine.scheduler().ticks(),
            counter.added,
            counter.deleted,
            counter.merges
        ))
    }

    fn format_tree(&self, snapshot: &TreeSnapshot) -> String {
        let mut output = format!("{}\n", snapshot.root.display());
        for entry in snapshot.visible() {
            let indent = "  ".repeat(entry.depth);
            let label = match entry.kind {
                NodeKind::Directory => format!("{}/", entry.name),
                NodeKind::File => entry.name.clone(),
            };
            if entry.member || !self.color {
                output.push_str(&format!("{}{}\n", indent, label));
            } else {
                output.push_str(&format!("{}{}\n", indent, label.dimmed()));
            }
        }
        output
    }

    fn paint_added(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_removed(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }
}

fn visible_paths(snapshot: &TreeSnapshot) -> BTreeSet<PathBuf> {
    snapshot.visible().map(|entry| entry.path.clone()).collect()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, SyncError> {
    serde_json::to_string_pretty(value).map_err(|e| SyncError::Io(e.into()))
}

fn format_status<H: ProjectHost>(
    engine: &SyncEngine<H, NotificationCounter>,
    outcome: &IdleOutcome,
) -> String {
    let status = engine.status();
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Metric", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("Root", status.root.display().to_string()),
        ("Nodes", status.nodes.to_string()),
        ("Members", status.members.to_string()),
        ("Non-members", status.non_members.to_string()),
        ("Visible", status.visible.to_string()),
        ("Directories", status.directories.to_string()),
        ("Files", status.files.to_string()),
        ("Symlink watchers", status.symlink_watchers.to_string()),
        ("Missing members", engine.listener().missing_members.to_string()),
        ("Merge units", outcome.units.to_string()),
    ];
    for (metric, value) in rows {
        table.add_row(vec![metric.to_string(), value]);
    }
    table.to_string()
}
