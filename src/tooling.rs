//! Tooling & Integration Layer
//!
//! Command-line front end over [`SyncEngine`](crate::sync::SyncEngine).

pub mod cli;

pub use cli::{Cli, CliContext, Commands, NotificationCounter, OutputFormat};
