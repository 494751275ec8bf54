use clap::Parser;
use colored::*;
use std::process;
use taed::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging with TAED_LOG environment variable support
    let log_level = std::env::var("TAED_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        // Use appropriate exit codes based on error type
        let exit_code = match e.downcast_ref::<taed::TaedError>() {
            Some(taed::TaedError::Config(_)) => 2,
            Some(taed::TaedError::Io(_)) | Some(taed::TaedError::Filesystem(_)) => 3,
            Some(taed::TaedError::Parse(_)) | Some(taed::TaedError::Validation(_)) => 4,
            Some(taed::TaedError::NotFound { .. }) => 5,
            Some(taed::TaedError::Incomplete { .. }) => 6,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let num_threads = if cli.threads == 0 {
        num_cpus::get()
    } else {
        cli.threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    if cli.verbose > 0 {
        eprintln!("Using {} threads", num_threads);
    }

    let config = cli.config.as_ref();
    match cli.command {
        Commands::Blast(args) => taed::cli::commands::blast::run(args, config),
        Commands::Remote(args) => taed::cli::commands::remote::run(args, config),
        Commands::Search(args) => taed::cli::commands::search::run(args),
        Commands::Config(args) => taed::cli::commands::config::run(args, config),
    }
}
