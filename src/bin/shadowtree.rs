//! Shadowtree CLI Binary
//!
//! Command-line interface for mirroring a directory as a project tree.

use anyhow::Context;
use clap::Parser;
use shadowtree::logging::init_logging;
use shadowtree::tooling::cli::{Cli, CliContext};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let context = CliContext::new(cli.root.clone(), cli.config.clone())
        .with_context(|| format!("failed to load configuration for {}", cli.root.display()))?;

    let logging = context.logging_config(&cli);
    init_logging(&logging, Some(&cli.root)).context("failed to initialize logging")?;

    let output = context.execute(&cli.command)?;
    println!("{}", output);
    Ok(())
}
