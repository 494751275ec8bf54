use crate::blast::filter::Filter;
use crate::blast::job::{ErrorKind, RunStatus, SearchRequest};
use crate::blast::service::{BlastService, ErrorResponse, ResultResponse, StatusResponse, SubmitResponse};
use crate::cli::output::*;
use crate::cli::{resolve_config, OutputFormat};
use crate::TaedError;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use std::path::PathBuf;

#[derive(Args)]
pub struct BlastArgs {
    #[command(subcommand)]
    pub command: BlastCommands,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum BlastCommands {
    /// Validate a query and launch one search per sequence
    Submit(SubmitArgs),

    /// Check progress of a job
    Status {
        /// Job id returned by submit
        job_id: String,
    },

    /// Fetch filtered hits of a completed job
    Result {
        job_id: String,
    },

    /// List persisted jobs
    List,

    /// Delete jobs older than the retention period
    Prune,
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Raw protein sequence
    #[arg(short, long, conflicts_with_all = ["file", "request"])]
    pub sequence: Option<String>,

    /// FASTA file with up to the configured number of sequences
    #[arg(long, conflicts_with = "request")]
    pub file: Option<PathBuf>,

    /// Full request as a JSON file (as posted to the web endpoint)
    #[arg(long)]
    pub request: Option<PathBuf>,

    #[arg(long)]
    pub job_name: Option<String>,

    /// Reuse a caller-chosen job id
    #[arg(long)]
    pub uuid: Option<String>,

    #[arg(short, long)]
    pub e_value: Option<String>,

    #[arg(short, long)]
    pub max_hits: Option<String>,

    /// Positive selection restriction (Y/N)
    #[arg(long)]
    pub dn_ds: Option<String>,

    /// JSON file with a list of result filters
    #[arg(long)]
    pub filters: Option<PathBuf>,
}

impl SubmitArgs {
    fn to_request(&self) -> anyhow::Result<SearchRequest> {
        let mut request = match &self.request {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str::<SearchRequest>(&content).map_err(|e| {
                    TaedError::Parse(format!("Invalid request file {}: {}", path.display(), e))
                })?
            }
            None => SearchRequest::default(),
        };

        // Flags override fields from the request file
        if self.sequence.is_some() {
            request.sequence = self.sequence.clone();
        }
        if self.file.is_some() {
            request.file_name = self.file.clone();
        }
        if self.job_name.is_some() {
            request.job_name = self.job_name.clone();
        }
        if self.uuid.is_some() {
            request.uuid = self.uuid.clone();
        }
        if self.e_value.is_some() {
            request.e_value = self.e_value.clone();
        }
        if self.max_hits.is_some() {
            request.max_hits = self.max_hits.clone();
        }
        if self.dn_ds.is_some() {
            request.dn_ds = self.dn_ds.clone();
        }
        if let Some(path) = &self.filters {
            let content = std::fs::read_to_string(path)?;
            request.filters = serde_json::from_str::<Vec<Filter>>(&content).map_err(|e| {
                TaedError::Parse(format!("Invalid filter file {}: {}", path.display(), e))
            })?;
        }

        Ok(request)
    }
}

pub fn run(args: BlastArgs, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = resolve_config(config_path)?;
    let service = BlastService::new(config)?;
    let format = args.format;

    match args.command {
        BlastCommands::Submit(submit) => run_submit(&service, &submit, format),
        BlastCommands::Status { job_id } => {
            let status = service.status(&job_id);
            report_failure(&status, format)?;
            print_status(&status?, format)
        }
        BlastCommands::Result { job_id } => {
            let result = service.result(&job_id);
            report_failure(&result, format)?;
            print_result(&result?, format)
        }
        BlastCommands::List => run_list(&service, format),
        BlastCommands::Prune => {
            let removed = service.prune()?;
            match format {
                OutputFormat::Json => print_json(&removed)?,
                OutputFormat::Text if removed.is_empty() => empty("No jobs past the retention period"),
                OutputFormat::Text => success(&format!("Pruned {} job(s)", removed.len())),
            }
            Ok(())
        }
    }
}

/// Structured error body on stdout for JSON consumers; the error itself still propagates
fn report_failure<T>(result: &Result<T, TaedError>, format: OutputFormat) -> anyhow::Result<()> {
    if let (Err(e), OutputFormat::Json) = (result, format) {
        print_json(&ErrorResponse::from(e))?;
    }
    Ok(())
}

fn run_submit(service: &BlastService, args: &SubmitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let request = args.to_request()?;
    let response = service.submit(&request);

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Text => print_submit(&response),
    }

    match (response.error_kind, response.error_message) {
        (None, _) => Ok(()),
        (Some(ErrorKind::Input), message) => {
            Err(TaedError::Validation(message.unwrap_or_default()).into())
        }
        (Some(ErrorKind::Environment), message) => {
            Err(TaedError::Filesystem(message.unwrap_or_default()).into())
        }
        (Some(_), message) => Err(TaedError::Launch(message.unwrap_or_default()).into()),
    }
}

fn print_submit(response: &SubmitResponse) {
    section_header("BLAST Submission");
    tree_item(false, "Job", Some(&response.job_id));
    tree_item(
        response.error_message.is_none(),
        "Status",
        Some(&colored_status(response.run_status).to_string()),
    );
    if let Some(message) = &response.error_message {
        tree_item(true, "Message", Some(message));
    } else {
        info(&format!("Check progress with: taed blast status {}", response.job_id));
    }
}

fn print_status(status: &StatusResponse, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(status);
    }

    section_header(&format!("Job {}", status.job_id));
    tree_item(false, "Status", Some(&colored_status(status.run_status).to_string()));
    tree_item(
        status.error_message.is_none(),
        "Outputs",
        Some(&format!("{}/{}", status.completed, status.total)),
    );
    if let Some(message) = &status.error_message {
        tree_item(true, "Message", Some(message));
    }
    Ok(())
}

fn print_result(result: &ResultResponse, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(result);
    }

    if result.hits.is_empty() {
        empty(&format!("Job {} produced no hits", result.job_id));
        return Ok(());
    }

    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Query"),
        header_cell("#"),
        header_cell("Hit"),
        header_cell("Description"),
        header_cell("Length"),
        header_cell("Bit score"),
        header_cell("E-value"),
    ]);

    for hit in &result.hits {
        table.add_row(vec![
            Cell::new(&hit.query_def),
            Cell::new(hit.hit_num),
            Cell::new(hit.key()),
            Cell::new(&hit.hit_def),
            Cell::new(hit.length),
            Cell::new(hit.best_bit_score().map(|s| format!("{:.1}", s)).unwrap_or_default()),
            Cell::new(hit.best_evalue().map(format_evalue).unwrap_or_default()),
        ]);
    }

    section_header(&format!("Hits for job {}", result.job_id));
    println!("{}", table);
    Ok(())
}

fn run_list(service: &BlastService, format: OutputFormat) -> anyhow::Result<()> {
    let jobs = service.list()?;

    if format == OutputFormat::Json {
        let summary: Vec<_> = jobs
            .iter()
            .map(|job| {
                serde_json::json!({
                    "job_id": job.id,
                    "job_name": job.job_name,
                    "run_status": job.run_status(),
                    "sequences": job.sequences.len(),
                    "created_at": job.created_at,
                })
            })
            .collect();
        return print_json(&summary);
    }

    if jobs.is_empty() {
        empty("No jobs recorded");
        return Ok(());
    }

    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Job"),
        header_cell("Name"),
        header_cell("Status"),
        header_cell("Sequences"),
        header_cell("Created"),
    ]);
    for job in &jobs {
        table.add_row(vec![
            Cell::new(&job.id),
            Cell::new(&job.job_name),
            status_cell(job.run_status()),
            Cell::new(job.sequences.len()),
            Cell::new(job.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    section_header("BLAST Jobs");
    println!("{}", table);

    let stuck = jobs
        .iter()
        .filter(|job| job.run_status() == RunStatus::InProgress && job.is_past_deadline(chrono::Utc::now()))
        .count();
    if stuck > 0 {
        warning(&format!("{} job(s) are past their deadline; run status to mark them failed", stuck));
    }
    Ok(())
}
