//! Command-line surface.

use clap::Parser;
use std::path::PathBuf;

/// Age out files by group: archive to object storage, delete, or move.
#[derive(Debug, Parser)]
#[command(name = "logpurge", version, about)]
pub struct Cli {
    /// Read options from this config file.
    #[arg(long, value_name = "FILE", default_value = "config.yaml")]
    pub cfg: PathBuf,

    /// List eligible files per group without running any action.
    #[arg(long)]
    pub list: bool,

    /// Only process the named group from the config file.
    #[arg(long, value_name = "GROUP")]
    pub only: Option<String>,

    /// Log the actions that would run, but execute none of them.
    #[arg(long)]
    pub simulate: bool,
}
