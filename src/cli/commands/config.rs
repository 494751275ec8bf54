use crate::cli::output::*;
use crate::cli::resolve_config;
use crate::core::config::{default_config, save_config};
use crate::core::paths::{default_config_path, Layout};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Root of the flat-file area
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration and resolved directories
    Show,
}

pub fn run(args: ConfigArgs, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    let path = config_path.cloned().unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommands::Init { data_dir, force } => {
            if path.exists() && !force {
                warning(&format!("{} already exists (use --force to overwrite)", path.display()));
                return Ok(());
            }
            let mut config = default_config();
            if let Some(dir) = data_dir {
                config.storage.data_dir = dir;
            }
            save_config(&path, &config)?;
            success(&format!("Wrote {}", path.display()));
        }
        ConfigCommands::Show => {
            let config = resolve_config(config_path)?;
            let layout = Layout::from_config(&config);

            println!("{}", toml::to_string_pretty(&config)?);
            section_header("Resolved paths");
            tree_item(false, "Config", Some(&path.display().to_string()));
            tree_item(false, "Jobs", Some(&layout.jobs_dir.display().to_string()));
            tree_item(false, "Outputs", Some(&layout.output_dir.display().to_string()));
            tree_item(false, "Database", Some(&layout.database.display().to_string()));
            tree_item(true, "Tool log", Some(&layout.log_file.display().to_string()));
        }
    }

    Ok(())
}
