use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::PlannedJob;
use crate::session::{CloseAck, SessionClient, SessionHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(String),
    Close { handle: String, elapsed: u64, job_id: String },
}

/// In-memory session client: handle `R<id>` per job, scripted failures.
#[derive(Default)]
pub struct StubClient {
    fail_open: HashSet<String>,
    fail_close: HashSet<String>,
    no_report: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_open(mut self, job_id: &str) -> Self {
        self.fail_open.insert(job_id.to_string());
        self
    }

    pub fn failing_close(mut self, job_id: &str) -> Self {
        self.fail_close.insert(job_id.to_string());
        self
    }

    pub fn without_report(mut self, job_id: &str) -> Self {
        self.no_report.insert(job_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionClient for StubClient {
    async fn check_ready(&self, job: &PlannedJob) -> Result<()> {
        if self.no_report.contains(job.id()) {
            return Err(Error::ReportNotFound {
                id: job.id().to_string(),
                reason: "no template".to_string(),
            });
        }
        Ok(())
    }

    async fn open(&self, job: &PlannedJob) -> Result<SessionHandle> {
        self.calls.lock().unwrap().push(Call::Open(job.id().to_string()));
        if self.fail_open.contains(job.id()) {
            return Err(Error::Protocol(format!("open refused for {}", job.id())));
        }
        Ok(SessionHandle::new(format!("R{}", job.id())))
    }

    async fn close(&self, handle: SessionHandle, elapsed_seconds: u64, job_id: &str) -> Result<CloseAck> {
        self.calls.lock().unwrap().push(Call::Close {
            handle: handle.as_str().to_string(),
            elapsed: elapsed_seconds,
            job_id: job_id.to_string(),
        });
        if self.fail_close.contains(job_id) {
            return Err(Error::Protocol(format!("close refused for {}", job_id)));
        }
        Ok(CloseAck("ok".to_string()))
    }
}
