/// On-disk job records
///
/// Every job is one pretty-printed JSON file named after its id. Records are
/// replaced by writing a temporary file in the same directory and renaming
/// it over the old one, so a reader never sees a half-written record.
/// Overlapping writers for the same id are not coordinated: the last rename
/// wins.
use crate::blast::job::Job;
use crate::core::paths::{is_safe_job_id, record_path};
use crate::TaedError;
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct JobStore {
    dir: PathBuf,
}

impl JobStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, job: &Job) -> Result<(), TaedError> {
        if !is_safe_job_id(&job.id) {
            return Err(TaedError::Validation(format!("Invalid job id: {}", job.id)));
        }

        let content = serde_json::to_string_pretty(job)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| {
            TaedError::Filesystem(format!("cannot create record in {}: {}", self.dir.display(), e))
        })?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(record_path(&self.dir, &job.id))
            .map_err(|e| TaedError::Filesystem(format!("cannot store record for job {}: {}", job.id, e)))?;

        tracing::debug!("Saved job {} ({})", job.id, job.run_status());
        Ok(())
    }

    pub fn load(&self, job_id: &str) -> Result<Job, TaedError> {
        let not_found = || TaedError::NotFound {
            job_id: job_id.to_string(),
        };

        if !is_safe_job_id(job_id) {
            return Err(not_found());
        }

        let path = record_path(&self.dir, job_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                return Err(TaedError::Unreadable {
                    job_id: job_id.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&content).map_err(|e| TaedError::Unreadable {
            job_id: job_id.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn exists(&self, job_id: &str) -> bool {
        is_safe_job_id(job_id) && record_path(&self.dir, job_id).is_file()
    }

    /// All readable job records, oldest first. Unreadable records are skipped.
    pub fn list(&self) -> Result<Vec<Job>, TaedError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut jobs = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(job_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(job_id) {
                Ok(job) => jobs.push(job),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    /// Remove a job record together with its query and output files
    pub fn delete(&self, job: &Job) -> Result<(), TaedError> {
        for path in job.input_files().into_iter().chain(job.output_files()) {
            remove_if_present(&path)?;
        }
        remove_if_present(&record_path(&self.dir, &job.id))
    }

    /// Delete jobs created more than `max_age` before `now`; returns the ids removed
    pub fn prune(&self, max_age: Duration, now: DateTime<Utc>) -> Result<Vec<String>, TaedError> {
        let mut removed = Vec::new();
        for job in self.list()? {
            if now - job.created_at > max_age {
                self.delete(&job)?;
                tracing::info!("Pruned job {}", job.id);
                removed.push(job.id);
            }
        }
        Ok(removed)
    }
}

fn remove_if_present(path: &Path) -> Result<(), TaedError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
