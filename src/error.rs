use thiserror::Error;

use crate::executor::JobReport;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),
    #[error("missing required config fields: {}", .0.join(", "))]
    MissingConfig(Vec<String>),
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("report template for experiment {id} unavailable: {reason}")]
    ReportNotFound { id: String, reason: String },
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Process exit status for this error at the CLI boundary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) | Error::MissingConfig(_) | Error::InvalidSelection(_) => 2,
            Error::Protocol(_) => 3,
            Error::ReportNotFound { .. } => 4,
            Error::Cancelled => 130,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Protocol(e.to_string())
    }
}

/// A run stopped at its first failing job. Jobs in `completed` stay done.
#[derive(Error, Debug)]
#[error("run aborted at experiment {job_id} after {} completed: {source}", .completed.len())]
pub struct RunAborted {
    pub job_id: String,
    pub completed: Vec<JobReport>,
    #[source]
    pub source: Error,
}

impl RunAborted {
    pub fn exit_code(&self) -> u8 {
        self.source.exit_code()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
