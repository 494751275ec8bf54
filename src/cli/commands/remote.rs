use crate::blast::job::{RunStatus, SearchRequest};
use crate::cli::output::*;
use crate::cli::{resolve_config, OutputFormat};
use crate::remote::RemoteClient;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub command: RemoteCommands,

    /// Remote service URL (overrides the configuration)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// Start a search on the remote service
    Submit {
        /// Raw protein sequence
        sequence: String,

        #[arg(long)]
        job_name: Option<String>,

        #[arg(long)]
        uuid: Option<String>,

        #[arg(short, long)]
        e_value: Option<String>,

        #[arg(short, long)]
        max_hits: Option<String>,
    },

    /// Current status of a remote job
    Status { uid: String },

    /// Hits of a completed remote job
    Result { uid: String },

    /// Poll until a remote job finishes, then print its hits
    Wait {
        uid: String,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

pub fn run(args: RemoteArgs, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    let mut config = resolve_config(config_path)?;
    if let Some(url) = args.url {
        config.remote.url = url;
    }
    let client = RemoteClient::new(&config.remote)?;
    let format = args.format;

    match args.command {
        RemoteCommands::Submit {
            sequence,
            job_name,
            uuid,
            e_value,
            max_hits,
        } => {
            let request = SearchRequest {
                job_name,
                uuid,
                e_value,
                max_hits,
                ..SearchRequest::with_sequence(sequence)
            };
            let response = client.submit(&request)?;
            match format {
                OutputFormat::Json => print_json(&response)?,
                OutputFormat::Text => {
                    success(&format!("Submitted to {}", client.base_url()));
                    tree_item(false, "Job", Some(&response.job_id));
                    tree_item(true, "Status", Some(&colored_status(response.run_status).to_string()));
                }
            }
        }
        RemoteCommands::Status { uid } => print_remote_status(&uid, client.status(&uid)?, format)?,
        RemoteCommands::Result { uid } => print_json(&client.result(&uid)?)?,
        RemoteCommands::Wait { uid, timeout } => {
            if format == OutputFormat::Text {
                info(&format!("Waiting for {} at {}", uid, client.status_url()));
            }
            let status = client.wait(&uid, timeout.map(Duration::from_secs))?;
            if status == RunStatus::Complete {
                print_json(&client.result(&uid)?)?;
            } else {
                print_remote_status(&uid, status, format)?;
                if status == RunStatus::Error {
                    error("Something went wrong on the remote service");
                }
            }
        }
    }

    Ok(())
}

fn print_remote_status(uid: &str, status: RunStatus, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "uid": uid, "run_status": status })),
        OutputFormat::Text => {
            println!("{} {}", uid, colored_status(status));
            Ok(())
        }
    }
}
