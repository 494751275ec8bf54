pub mod commands;
pub mod output;

use crate::core::config::{load_config, load_config_or_default, Config};
use crate::core::paths::default_config_path;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "taed",
    version,
    about = "BLAST job gateway for the TAED gene family database",
    long_about = "taed submits protein similarity searches against a local BLAST database, \
                  tracks them as persisted jobs, and returns filtered hits once every \
                  per-sequence search has written its report. It can also drive a remote \
                  TAED service and build family search conditionals."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use for report parsing (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,

    /// Configuration file (defaults to $TAED_HOME/config.toml)
    #[arg(short, long, global = true, env = "TAED_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit and track local BLAST jobs
    Blast(commands::blast::BlastArgs),

    /// Talk to a remote TAED BLAST service
    Remote(commands::remote::RemoteArgs),

    /// Gene family search helpers
    Search(commands::search::SearchArgs),

    /// Inspect or create the configuration file
    Config(commands::config::ConfigArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Explicit config paths must exist; the default one may be absent
pub fn resolve_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => load_config_or_default(default_config_path())?,
    };
    Ok(config)
}
