use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub blast: BlastConfig,
    pub defaults: DefaultsConfig,
    pub jobs: JobsConfig,
    pub remote: RemoteConfig,
    pub results: ResultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the flat-file area (BLAST database, job records, outputs)
    pub data_dir: PathBuf,
    /// Job records and per-sequence query files; relative to `data_dir`
    pub jobs_dir: PathBuf,
    /// Per-sequence search output; relative to `data_dir`
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastConfig {
    /// Search tool executable, resolved through PATH when not absolute
    pub program: String,
    /// Protein reference database; relative to `data_dir`
    pub database: PathBuf,
    /// Parallelism hint handed to the tool
    pub threads: usize,
    /// Shared append-only log for tool stdout/stderr; relative to the output directory
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub e_value: f64,
    pub max_hits: u32,
    /// Upper bound on sequences per submission
    pub max_sequences: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Seconds after launch before an unfinished job is considered failed
    pub timeout_secs: u64,
    /// Age in days after which job records may be pruned
    pub retention_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// JSON file mapping hit keys to metadata fields (e.g. tree URLs)
    pub metadata_file: Option<PathBuf>,
    pub tree_fetch_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::core::paths::taed_home().join("data"),
            jobs_dir: PathBuf::from("blasts"),
            output_dir: PathBuf::from("blasted"),
        }
    }
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            program: "blastall".to_string(),
            database: PathBuf::from("BLAST").join("DATABASE99.fasta"),
            threads: 2,
            log_file: PathBuf::from("blastout.out"),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            e_value: 1.0,
            max_hits: 50,
            max_sequences: 5,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 24 * 60 * 60,
            retention_days: 7,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "https://liberles.cst.temple.edu/TAED/json/BLAST".to_string(),
            timeout_secs: 30,
            poll_interval_secs: 5,
        }
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            metadata_file: None,
            tree_fetch_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Configuration rooted at `data_dir`, everything else default
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        let mut config = Self::default();
        config.storage.data_dir = data_dir.as_ref().to_path_buf();
        config
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, crate::TaedError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::TaedError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

/// Load the config at `path`, or defaults when the file does not exist
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, crate::TaedError> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), crate::TaedError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::TaedError::Config(format!("Failed to serialize config: {}", e)))?;
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = Config::default();
        assert_eq!(config.blast.program, "blastall");
        assert_eq!(config.defaults.max_hits, 50);
        assert_eq!(config.defaults.e_value, 1.0);
        assert_eq!(config.defaults.max_sequences, 5);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            data_dir = "/srv/taed"

            [defaults]
            max_hits = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/taed"));
        assert_eq!(config.storage.output_dir, PathBuf::from("blasted"));
        assert_eq!(config.defaults.max_hits, 10);
        assert_eq!(config.defaults.e_value, 1.0);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::with_data_dir(dir.path());
        config.jobs.timeout_secs = 60;

        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.jobs.timeout_secs, 60);
        assert_eq!(loaded.storage.data_dir, dir.path());
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults\nmax_hits = ").unwrap();

        assert!(matches!(load_config(&path), Err(crate::TaedError::Config(_))));
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.defaults.max_sequences, 5);
    }
}
