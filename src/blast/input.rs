/// Sequence input normalization and job construction
///
/// A submission may carry its query residues in one of four shapes. They are
/// tried in a fixed order (pre-encoded records, raw string, uploaded file
/// content, local file path) and only the first one present is used.
use crate::bio::fasta;
use crate::bio::sequence::Sequence;
use crate::blast::job::{Job, JobStatus, Limits, SearchRequest, SelectionFilter};
use crate::core::config::DefaultsConfig;
use crate::core::paths::is_safe_job_id;
use crate::TaedError;
use chrono::Utc;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

pub const DEFAULT_JOB_NAME: &str = "BLAST Search";

/// The 20 standard residues, ambiguity codes B/Z/X, stop and gap
static AMINO_ACID_SEQUENCE: OnceLock<Regex> = OnceLock::new();

fn amino_acid_sequence() -> &'static Regex {
    AMINO_ACID_SEQUENCE.get_or_init(|| {
        Regex::new(r"(?i)^[ACDEFGHIKLMNPQRSTVWYBZX*\-\r\n]+$").expect("amino acid pattern is valid")
    })
}

/// Query sequences as submitted, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceInput {
    /// JSON-encoded list of sequence records
    Records(String),
    /// Bare residue string
    Raw(String),
    /// FASTA text uploaded with the request
    FileContent(String),
    /// FASTA file readable by the server
    FilePath(PathBuf),
}

impl SequenceInput {
    /// Pick the first sequence form present in the request
    pub fn from_request(request: &SearchRequest) -> Option<Self> {
        if let Some(records) = &request.seq_obj {
            Some(SequenceInput::Records(records.clone()))
        } else if let Some(sequence) = &request.sequence {
            Some(SequenceInput::Raw(sequence.clone()))
        } else if let Some(content) = &request.file_data {
            Some(SequenceInput::FileContent(content.clone()))
        } else {
            request
                .file_name
                .as_ref()
                .map(|path| SequenceInput::FilePath(path.clone()))
        }
    }
}

/// Check a raw residue string against the protein alphabet (case-insensitive,
/// line breaks tolerated)
pub fn is_valid_protein(sequence: &str) -> bool {
    amino_acid_sequence().is_match(sequence)
}

/// Turn any accepted input into an ordered list of named records
pub fn normalize(input: &SequenceInput, job_name: &str) -> Result<Vec<Sequence>, TaedError> {
    match input {
        SequenceInput::Records(encoded) => serde_json::from_str::<Vec<Sequence>>(encoded)
            .map(|records| {
                records
                    .into_iter()
                    .map(|mut record| {
                        record.sequence.retain(|c| !c.is_ascii_whitespace());
                        record.sequence.make_ascii_uppercase();
                        record
                    })
                    .collect()
            })
            .map_err(|e| TaedError::Validation(format!("Invalid Sequence Object: {}", e))),
        SequenceInput::Raw(raw) => {
            let residues: Vec<u8> = raw
                .bytes()
                .filter(|c| *c != b'\n' && *c != b'\r')
                .map(|c| c.to_ascii_uppercase())
                .collect();

            if !is_valid_protein(raw) || residues.is_empty() {
                return Err(TaedError::Validation(format!(
                    "Submitted sequence ({}) is not a valid sequence.",
                    raw
                )));
            }

            Ok(vec![Sequence::new(job_name.to_string(), residues)])
        }
        SequenceInput::FileContent(content) => fasta::parse_fasta_str(content)
            .map_err(|e| TaedError::Validation(format!("Invalid FASTA data: {}", e))),
        SequenceInput::FilePath(path) => fasta::parse_fasta(path).map_err(|e| {
            TaedError::Validation(format!("Unable to read FASTA file {}: {}", path.display(), e))
        }),
    }
}

fn parse_limits(request: &SearchRequest, defaults: &DefaultsConfig) -> Result<Limits, TaedError> {
    let invalid = |detail: String| {
        TaedError::Validation(format!("Invalid Numeric Parameters (e_value / max_hits): {}", detail))
    };

    let e_value = match request.e_value.as_deref().map(str::trim) {
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| invalid(format!("e_value '{}'", raw)))?,
        None => defaults.e_value,
    };

    let max_hits = match request.max_hits.as_deref().map(str::trim) {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| invalid(format!("max_hits '{}'", raw)))?,
        None => defaults.max_hits,
    };

    let selection = request.dn_ds.as_deref().and_then(SelectionFilter::parse);

    Ok(Limits {
        e_value,
        max_hits,
        selection,
    })
}

/// Build a job from a request.
///
/// Never fails: validation problems leave the job UNINITIALIZED with an
/// input error recorded in its status, and no I/O beyond reading a named
/// FASTA file happens here.
pub fn build_job(request: &SearchRequest, defaults: &DefaultsConfig) -> Job {
    let job_name = request
        .job_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_JOB_NAME)
        .to_string();

    let mut job = Job {
        id: Uuid::new_v4().to_string(),
        job_name,
        sequences: Vec::new(),
        limits: Limits {
            e_value: defaults.e_value,
            max_hits: defaults.max_hits,
            selection: None,
        },
        filters: request.filters.clone(),
        paths: None,
        status: JobStatus::uninitialized(),
        created_at: Utc::now(),
        launched_at: None,
        deadline: None,
        process_ids: Vec::new(),
    };

    if let Some(uuid) = &request.uuid {
        if !is_safe_job_id(uuid) {
            job.status = JobStatus::invalid(format!("Invalid job id: {}", uuid));
            return job;
        }
        job.id = uuid.clone();
    }

    match parse_limits(request, defaults) {
        Ok(limits) => job.limits = limits,
        Err(e) => {
            job.status = JobStatus::invalid(e.to_string());
            return job;
        }
    }

    let input = match SequenceInput::from_request(request) {
        Some(input) => input,
        None => {
            job.status = JobStatus::invalid("A sequence or FASTA file must be sent.");
            return job;
        }
    };

    match normalize(&input, &job.job_name) {
        Ok(sequences) if sequences.len() > defaults.max_sequences => {
            job.status = JobStatus::invalid(format!(
                "Too many sequences: {} submitted, at most {} allowed.",
                sequences.len(),
                defaults.max_sequences
            ));
        }
        Ok(sequences) => {
            job.sequences = sequences;
            job.status = JobStatus::ready();
        }
        Err(e) => job.status = JobStatus::invalid(e.to_string()),
    }

    job
}
