use crate::core::config::Config;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static TAED_HOME: OnceLock<PathBuf> = OnceLock::new();

/// Get the TAED home directory
/// Checks TAED_HOME environment variable, falls back to ${HOME}/.taed
pub fn taed_home() -> PathBuf {
    TAED_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("TAED_HOME") {
                PathBuf::from(path)
            } else {
                let home = std::env::var("HOME").unwrap_or_else(|_| {
                    std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string())
                });
                PathBuf::from(home).join(".taed")
            }
        })
        .clone()
}

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    taed_home().join("config.toml")
}

/// Job ids double as file names, so only ASCII alphanumerics and `-` are allowed
pub fn is_safe_job_id(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id.len() <= 64
        && job_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Absolute directory layout derived from a [`Config`]
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub data_dir: PathBuf,
    pub jobs_dir: PathBuf,
    pub output_dir: PathBuf,
    pub database: PathBuf,
    pub log_file: PathBuf,
}

impl Layout {
    pub fn from_config(config: &Config) -> Self {
        let data_dir = config.storage.data_dir.clone();
        let jobs_dir = data_dir.join(&config.storage.jobs_dir);
        let output_dir = data_dir.join(&config.storage.output_dir);
        let database = data_dir.join(&config.blast.database);
        let log_file = output_dir.join(&config.blast.log_file);

        Self {
            data_dir,
            jobs_dir,
            output_dir,
            database,
            log_file,
        }
    }

    /// Create the job and output directories under an existing data directory
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if !self.data_dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("data directory {} does not exist", self.data_dir.display()),
            ));
        }
        std::fs::create_dir_all(&self.jobs_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    pub fn record_path(&self, job_id: &str) -> PathBuf {
        record_path(&self.jobs_dir, job_id)
    }
}

/// Persisted job record: `<jobs_dir>/<id>.json`
pub fn record_path(jobs_dir: &Path, job_id: &str) -> PathBuf {
    jobs_dir.join(format!("{}.json", job_id))
}

/// Query file for sequence `index` of a job: `<jobs_dir>/<id>_<index>.fasta`
pub fn input_path(jobs_dir: &Path, job_id: &str, index: usize) -> PathBuf {
    jobs_dir.join(format!("{}_{}.fasta", job_id, index))
}

/// Search output for sequence `index` of a job: `<output_dir>/<id>_<index>`
pub fn output_path(output_dir: &Path, job_id: &str, index: usize) -> PathBuf {
    output_dir.join(format!("{}_{}", job_id, index))
}
