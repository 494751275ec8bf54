use crate::blast::job::{ErrorKind, Job, RunStatus};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Decides whether a single search has produced its output
pub trait CompletionProbe: Send + Sync {
    fn is_complete(&self, output: &Path) -> bool;
}

/// Treats an output file as done once it exists and is non-empty.
///
/// A truncated report looks the same as a finished one here; the tool is
/// expected to write its output in one step.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSizeProbe;

impl CompletionProbe for FileSizeProbe {
    fn is_complete(&self, output: &Path) -> bool {
        std::fs::metadata(output)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }
}

pub struct StatusResolver<P: CompletionProbe = FileSizeProbe> {
    probe: P,
}

impl Default for StatusResolver<FileSizeProbe> {
    fn default() -> Self {
        Self { probe: FileSizeProbe }
    }
}

impl<P: CompletionProbe> StatusResolver<P> {
    pub fn with_probe(probe: P) -> Self {
        Self { probe }
    }

    /// Number of sequences whose output is present
    pub fn completed(&self, job: &Job) -> usize {
        job.output_files()
            .iter()
            .filter(|output| self.probe.is_complete(output))
            .count()
    }

    pub fn resolve(&self, job: &mut Job) -> RunStatus {
        self.resolve_at(job, Utc::now())
    }

    /// Derive the current run status from the filesystem, upgrading the job
    /// to COMPLETE or timing it out as needed. ERROR is never left.
    pub fn resolve_at(&self, job: &mut Job, now: DateTime<Utc>) -> RunStatus {
        if job.run_status() == RunStatus::Error {
            return RunStatus::Error;
        }

        let expected = job.sequences.len();
        if expected > 0 && self.completed(job) == expected {
            job.status.run_status = RunStatus::Complete;
            job.status.error_message = None;
            return RunStatus::Complete;
        }

        if job.run_status() == RunStatus::InProgress && job.is_past_deadline(now) {
            tracing::warn!("Job {} passed its deadline without finishing", job.id);
            job.fail(
                ErrorKind::Timeout,
                "The search did not finish in the allotted time.",
            );
            return RunStatus::Error;
        }

        job.run_status()
    }
}
