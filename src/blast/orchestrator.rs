use crate::blast::job::{ErrorKind, Job, RunStatus};
use crate::blast::params::ParameterBuilder;
use crate::core::config::Config;
use crate::core::paths::Layout;
use crate::tools::traits::Launcher;
use chrono::{DateTime, Duration, Utc};

pub const FILESYSTEM_FAILURE_MESSAGE: &str =
    "Remote server is having filesystem issues. Please notify the system administrator.";

/// Turns a READY job into running search processes.
///
/// Launching never waits for a search to finish. On success the job is
/// IN_PROGRESS with a deadline; any failure leaves it in ERROR with a
/// message suitable for the client.
pub struct Orchestrator<'a> {
    config: &'a Config,
    layout: Layout,
    launcher: &'a dyn Launcher,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, launcher: &'a dyn Launcher) -> Self {
        Self {
            config,
            layout: Layout::from_config(config),
            launcher,
        }
    }

    pub fn run(&self, job: &mut Job) {
        if !job.is_ready() {
            tracing::debug!("Job {} is {}, not launching", job.id, job.run_status());
            return;
        }

        if let Err(e) = self.layout.ensure_dirs() {
            tracing::error!("Job {}: {}", job.id, e);
            job.fail(ErrorKind::Environment, FILESYSTEM_FAILURE_MESSAGE);
            return;
        }

        let builder = ParameterBuilder::new(&self.config.blast, &self.layout.database);
        let invocations = match builder.build(job, &self.layout.jobs_dir, &self.layout.output_dir) {
            Ok(invocations) => invocations,
            Err(e) => {
                tracing::error!("Job {}: {}", job.id, e);
                job.fail(ErrorKind::Environment, FILESYSTEM_FAILURE_MESSAGE);
                return;
            }
        };

        let now = Utc::now();
        job.status.run_status = RunStatus::InProgress;
        job.status.error_message = None;
        job.launched_at = Some(now);
        job.deadline = deadline_after(now, self.config.jobs.timeout_secs);
        if job.deadline.is_none() {
            tracing::warn!(
                "Job {}: timeout of {}s is out of range, no deadline set",
                job.id,
                self.config.jobs.timeout_secs
            );
        }

        for invocation in &invocations {
            match self.launcher.launch(invocation) {
                Ok(pid) => {
                    tracing::info!(
                        "Job {}: launched {} for query {} (pid {})",
                        job.id,
                        self.launcher.name(),
                        invocation.index,
                        pid
                    );
                    job.process_ids.push(pid);
                }
                Err(e) => {
                    // Siblings already running are left alone; the job is failed as a whole
                    tracing::error!("Job {}: launch of query {} failed: {}", job.id, invocation.index, e);
                    job.fail(
                        ErrorKind::Launch,
                        format!("Unable to start the search for sequence {}: {}", invocation.index, e),
                    );
                    return;
                }
            }
        }
    }
}

/// `None` when the timeout does not fit in a timestamp
fn deadline_after(launched_at: DateTime<Utc>, timeout_secs: u64) -> Option<DateTime<Utc>> {
    i64::try_from(timeout_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|timeout| launched_at.checked_add_signed(timeout))
}
