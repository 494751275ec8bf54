use crate::bio::sequence::Sequence;
use crate::blast::filter::Filter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle stage of a BLAST job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Uninitialized,
    Ready,
    InProgress,
    Complete,
    Error,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Uninitialized => "UNINITIALIZED",
            RunStatus::Ready => "READY",
            RunStatus::InProgress => "IN_PROGRESS",
            RunStatus::Complete => "COMPLETE",
            RunStatus::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Which side an error came from, so clients know whether resubmitting helps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad sequence, thresholds or missing fields
    Input,
    /// Server-side folders missing or unwritable
    Environment,
    /// The search tool could not be started
    Launch,
    /// The job outlived its deadline
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub run_status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl JobStatus {
    pub fn uninitialized() -> Self {
        Self {
            run_status: RunStatus::Uninitialized,
            error_message: Some("Uninitialized".to_string()),
            error_kind: None,
        }
    }

    pub fn ready() -> Self {
        Self {
            run_status: RunStatus::Ready,
            error_message: None,
            error_kind: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            run_status: RunStatus::Uninitialized,
            error_message: Some(message.into()),
            error_kind: Some(ErrorKind::Input),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            run_status: RunStatus::Error,
            error_message: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    /// True for validation failures and terminal errors alike
    pub fn is_error(&self) -> bool {
        self.run_status == RunStatus::Error || self.error_kind.is_some()
    }
}

/// Positive-selection restriction requested with the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionFilter {
    PositiveOnly,
    NegativeOnly,
}

impl SelectionFilter {
    /// `Y`/`y`/`True` select positive, `N`/`n`/`False` negative, anything else no filter
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Y" | "y" | "True" => Some(SelectionFilter::PositiveOnly),
            "N" | "n" | "False" => Some(SelectionFilter::NegativeOnly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub e_value: f64,
    pub max_hits: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionFilter>,
}

/// Where a job's artifacts live; set once when invocations are built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPaths {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl JobPaths {
    pub fn input_file(&self, job_id: &str, index: usize) -> PathBuf {
        crate::core::paths::input_path(&self.input_dir, job_id, index)
    }

    pub fn output_file(&self, job_id: &str, index: usize) -> PathBuf {
        crate::core::paths::output_path(&self.output_dir, job_id, index)
    }
}

/// Raw search submission, as received from a form, query string or JSON body.
///
/// Thresholds stay strings here; they are validated when the job is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string", skip_serializing_if = "Option::is_none")]
    pub e_value: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string", skip_serializing_if = "Option::is_none")]
    pub max_hits: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string", skip_serializing_if = "Option::is_none")]
    pub dn_ds: Option<String>,
    /// Pre-encoded JSON list of sequence records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_obj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

/// Accept `"10"`, `10` or `true` alike; clients are loose about JSON types
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(if b { "True" } else { "False" }.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

impl SearchRequest {
    pub fn with_sequence(sequence: impl Into<String>) -> Self {
        Self {
            sequence: Some(sequence.into()),
            ..Self::default()
        }
    }

    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_name: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }
}

/// One submitted similarity search, tracked by id through its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub job_name: String,
    pub sequences: Vec<Sequence>,
    pub limits: Limits,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<JobPaths>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// OS process ids of launched searches, for operators
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub process_ids: Vec<u32>,
}

impl Job {
    pub fn run_status(&self) -> RunStatus {
        self.status.run_status
    }

    pub fn is_ready(&self) -> bool {
        self.status.run_status == RunStatus::Ready && !self.status.is_error()
    }

    /// Record a terminal failure
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.status = JobStatus::failed(kind, message);
    }

    /// Output artifact for sequence `index`, if paths have been assigned
    pub fn output_file(&self, index: usize) -> Option<PathBuf> {
        self.paths.as_ref().map(|p| p.output_file(&self.id, index))
    }

    pub fn output_files(&self) -> Vec<PathBuf> {
        (0..self.sequences.len())
            .filter_map(|i| self.output_file(i))
            .collect()
    }

    pub fn input_files(&self) -> Vec<PathBuf> {
        match &self.paths {
            Some(paths) => (0..self.sequences.len())
                .map(|i| paths.input_file(&self.id, i))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map_or(false, |deadline| now > deadline)
    }
}
