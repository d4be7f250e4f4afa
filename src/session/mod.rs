//! Remote session protocol: open a timed experiment, close it with a report.

pub mod client;
pub mod report;

pub use client::HttpSessionClient;
pub use report::ReportTemplate;

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;
use crate::model::PlannedJob;

/// Opaque id of one open remote experiment.
///
/// Not `Clone`: `close` takes it by value, so each handle is consumed
/// exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body returned by the service when a session is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseAck(pub String);

#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Verify everything `close` will need for `job` before any session is
    /// opened. Called for every job of a plan ahead of the first `open`.
    async fn check_ready(&self, _job: &PlannedJob) -> Result<()> {
        Ok(())
    }

    async fn open(&self, job: &PlannedJob) -> Result<SessionHandle>;

    async fn close(&self, handle: SessionHandle, elapsed_seconds: u64, job_id: &str) -> Result<CloseAck>;
}
