pub mod bio;
pub mod blast;
pub mod cli;
pub mod core;
pub mod remote;
pub mod search;
pub mod tools;

pub use crate::blast::service::BlastService;
pub use crate::core::config::Config;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Failed to launch search: {0}")]
    Launch(String),

    #[error("No record found for job {job_id}")]
    NotFound { job_id: String },

    #[error("Error reading record for job {job_id}: {reason}")]
    Unreadable { job_id: String, reason: String },

    #[error("BLAST run for job {job_id} is not complete ({status})")]
    Incomplete {
        job_id: String,
        status: crate::blast::job::RunStatus,
    },

    #[error("Filter error: {0}")]
    Filter(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TaedError>;
