/// Asynchronous BLAST job lifecycle
///
/// A submission is normalized into a [`job::Job`], one search process is
/// launched per query sequence, and the job record is persisted. Later
/// calls reload the record, derive progress from the output files, and
/// once everything is written parse and filter the hits.
pub mod filter;
pub mod input;
pub mod job;
pub mod metadata;
pub mod orchestrator;
pub mod params;
pub mod report;
pub mod service;
pub mod status;
pub mod store;

pub use filter::{Filter, FilterRegistry};
pub use job::{ErrorKind, Job, JobStatus, RunStatus, SearchRequest};
pub use report::Hit;
pub use service::{BlastService, ErrorResponse, ResultResponse, StatusResponse, SubmitResponse};
pub use store::JobStore;
