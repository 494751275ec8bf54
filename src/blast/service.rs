/// Submit / status / result operations over the job store
///
/// Every call works on a freshly loaded copy of the job; the store holds
/// the authoritative state between calls.
use crate::blast::filter::{prep_filters, FilterRegistry, HttpTreeFetcher, TreeFetcher};
use crate::blast::input::build_job;
use crate::blast::job::{ErrorKind, Job, JobStatus, RunStatus, SearchRequest};
use crate::blast::metadata::{EmptyMetadata, HitMetadata, JsonFileMetadata, MetadataSource};
use crate::blast::orchestrator::Orchestrator;
use crate::blast::report::{parse_reports, Hit};
use crate::blast::status::{CompletionProbe, FileSizeProbe, StatusResolver};
use crate::blast::store::JobStore;
use crate::core::config::Config;
use crate::core::paths::Layout;
use crate::tools::blastall::ProcessLauncher;
use crate::tools::traits::Launcher;
use crate::TaedError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub run_status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub run_status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Sequences whose output is present, out of `total`
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultResponse {
    pub job_id: String,
    pub hits: Vec<Hit>,
    pub metadata: HitMetadata,
}

/// Structured failure shape for status and result calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "Error")]
    pub error: String,
    #[serde(default, alias = "UID", skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, alias = "Status", skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
}

impl From<&TaedError> for ErrorResponse {
    fn from(err: &TaedError) -> Self {
        match err {
            TaedError::NotFound { job_id } => Self {
                error: "No Record Found".to_string(),
                uid: Some(job_id.clone()),
                status: None,
            },
            TaedError::Incomplete { job_id, status } => Self {
                error: "BLAST Not Complete".to_string(),
                uid: Some(job_id.clone()),
                status: Some(*status),
            },
            TaedError::Unreadable { job_id, .. } => Self {
                error: "Record Unreadable".to_string(),
                uid: Some(job_id.clone()),
                status: None,
            },
            other => Self {
                error: other.to_string(),
                uid: None,
                status: None,
            },
        }
    }
}

pub struct BlastService<L: Launcher = ProcessLauncher, P: CompletionProbe = FileSizeProbe> {
    config: Config,
    layout: Layout,
    store: JobStore,
    launcher: L,
    resolver: StatusResolver<P>,
    registry: FilterRegistry,
    metadata: Box<dyn MetadataSource>,
    fetcher: Box<dyn TreeFetcher>,
}

impl BlastService {
    /// Service backed by the configured search tool and real HTTP tree fetches
    pub fn new(config: Config) -> Result<Self, TaedError> {
        let layout = Layout::from_config(&config);
        let launcher = ProcessLauncher::new(config.blast.program.clone(), layout.log_file.clone());
        if let Err(e) = launcher.verify_installation() {
            // Submissions still go through and fail per job with a launch error
            tracing::warn!("{}", e);
        }
        let fetcher = HttpTreeFetcher::new(Duration::from_secs(config.results.tree_fetch_timeout_secs))?;

        let mut service = Self::with_launcher(config, launcher);
        service.fetcher = Box::new(fetcher);
        Ok(service)
    }
}

struct NoTrees;

impl TreeFetcher for NoTrees {
    fn fetch(&self, url: &str) -> Result<crate::bio::newick::Tree, TaedError> {
        Err(TaedError::Remote(format!("tree fetching is disabled ({})", url)))
    }
}

impl<L: Launcher> BlastService<L, FileSizeProbe> {
    pub fn with_launcher(config: Config, launcher: L) -> Self {
        let layout = Layout::from_config(&config);
        let metadata: Box<dyn MetadataSource> = match &config.results.metadata_file {
            Some(path) => Box::new(JsonFileMetadata::new(path)),
            None => Box::new(EmptyMetadata),
        };

        Self {
            store: JobStore::new(&layout.jobs_dir),
            layout,
            config,
            launcher,
            resolver: StatusResolver::default(),
            registry: FilterRegistry::default(),
            metadata,
            fetcher: Box::new(NoTrees),
        }
    }
}

impl<L: Launcher, P: CompletionProbe> BlastService<L, P> {
    pub fn with_probe<Q: CompletionProbe>(self, probe: Q) -> BlastService<L, Q> {
        BlastService {
            config: self.config,
            layout: self.layout,
            store: self.store,
            launcher: self.launcher,
            resolver: StatusResolver::with_probe(probe),
            registry: self.registry,
            metadata: self.metadata,
            fetcher: self.fetcher,
        }
    }

    pub fn with_registry(mut self, registry: FilterRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_metadata(mut self, metadata: impl MetadataSource + 'static) -> Self {
        self.metadata = Box::new(metadata);
        self
    }

    pub fn with_tree_fetcher(mut self, fetcher: impl TreeFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Validate, launch and persist a search.
    ///
    /// Input errors come back in the response and leave nothing on disk.
    /// Launch-time failures are persisted as ERROR so later status calls see them.
    pub fn submit(&self, request: &SearchRequest) -> SubmitResponse {
        let mut job = build_job(request, &self.config.defaults);

        // A reused id would pick up the earlier job's outputs as its own
        if job.is_ready() && self.store.exists(&job.id) {
            job.status = JobStatus::invalid(format!("Job id {} is already in use.", job.id));
        }

        if job.is_ready() {
            Orchestrator::new(&self.config, &self.launcher).run(&mut job);
            if let Err(e) = self.store.save(&job) {
                tracing::error!("Job {}: could not persist record: {}", job.id, e);
                job.fail(ErrorKind::Environment, crate::blast::orchestrator::FILESYSTEM_FAILURE_MESSAGE);
            }
        } else {
            tracing::info!(
                "Rejected submission: {}",
                job.status.error_message.as_deref().unwrap_or("invalid input")
            );
        }

        SubmitResponse {
            job_id: job.id,
            run_status: job.status.run_status,
            error_message: job.status.error_message,
            error_kind: job.status.error_kind,
        }
    }

    fn load_resolved(&self, job_id: &str) -> Result<Job, TaedError> {
        let mut job = self.store.load(job_id)?;
        let before = job.status.clone();
        self.resolver.resolve(&mut job);
        if job.status != before {
            tracing::info!("Job {} is now {}", job.id, job.run_status());
        }
        self.store.save(&job)?;
        Ok(job)
    }

    pub fn status(&self, job_id: &str) -> Result<StatusResponse, TaedError> {
        let job = self.load_resolved(job_id)?;
        Ok(StatusResponse {
            completed: self.resolver.completed(&job),
            total: job.sequences.len(),
            job_id: job.id,
            run_status: job.status.run_status,
            error_message: job.status.error_message,
            error_kind: job.status.error_kind,
        })
    }

    /// Parsed and filtered hits; only available once the job is COMPLETE
    pub fn result(&self, job_id: &str) -> Result<ResultResponse, TaedError> {
        let job = self.load_resolved(job_id)?;
        if job.run_status() != RunStatus::Complete {
            return Err(TaedError::Incomplete {
                status: job.status.run_status,
                job_id: job.id,
            });
        }

        let hits = parse_reports(&job.output_files())?;
        let metadata = self.metadata.load()?;

        let mut filters = prep_filters(&job.filters, &metadata, &self.registry, self.fetcher.as_ref())?;
        let total = hits.len();
        let hits = filters.run_filters(hits)?;
        tracing::debug!("Job {}: {} of {} hits kept by {} filters", job.id, hits.len(), total, filters.len());

        Ok(ResultResponse {
            job_id: job.id,
            hits,
            metadata,
        })
    }

    pub fn list(&self) -> Result<Vec<Job>, TaedError> {
        self.store.list()
    }

    /// Remove jobs older than the configured retention period
    pub fn prune(&self) -> Result<Vec<String>, TaedError> {
        let max_age = chrono::Duration::days(self.config.jobs.retention_days as i64);
        self.store.prune(max_age, chrono::Utc::now())
    }
}
