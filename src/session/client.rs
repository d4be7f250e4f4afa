use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, EXPECT};
use reqwest::Response;
use tracing::{debug, info};

use super::{CloseAck, ReportTemplate, SessionClient, SessionHandle};
use crate::config::{Config, Identity, ReportConfig, ServiceConfig};
use crate::error::{Error, Result};
use crate::model::PlannedJob;

pub const START_PATH: &str = "start.do";
pub const STOP_PATH: &str = "stop.do";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Talks to the simulation service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    http: reqwest::Client,
    service: ServiceConfig,
    identity: Identity,
    reports: ReportConfig,
}

impl HttpSessionClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.service.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("build http client: {}", e)))?;

        Ok(Self {
            http,
            service: config.service.clone(),
            identity: config.identity.clone(),
            reports: config.reports.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.service.base_url, path)
    }
}

async fn success_body(resp: Response, call: &str) -> Result<String> {
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Protocol(format!("{} returned status {}", call, status)));
    }
    Ok(resp.text().await?)
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn check_ready(&self, job: &PlannedJob) -> Result<()> {
        let template = ReportTemplate::load(&self.reports.dir, self.reports.encoding, job.id())?;
        debug!(job = template.job_id(), "report template ready");
        Ok(())
    }

    async fn open(&self, job: &PlannedJob) -> Result<SessionHandle> {
        let account = self.identity.account_id();
        let resp = self
            .http
            .post(self.endpoint(START_PATH))
            .query(&[
                ("itemID", job.id()),
                ("subID", "0"),
                ("userAutoid", account.as_str()),
                ("autoid", ""),
                ("key", self.service.key.as_str()),
            ])
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .send()
            .await?;

        let body = success_body(resp, "open").await?;
        if body.trim().is_empty() {
            return Err(Error::Protocol(format!(
                "open for experiment {} returned an empty session id",
                job.id()
            )));
        }
        info!(job = job.id(), session = %body, "session opened");
        Ok(SessionHandle::new(body))
    }

    async fn close(&self, handle: SessionHandle, elapsed_seconds: u64, job_id: &str) -> Result<CloseAck> {
        let template = ReportTemplate::load(&self.reports.dir, self.reports.encoding, job_id)?;
        let report = template.to_report(&self.identity, elapsed_seconds);
        let elapsed = self.service.elapsed_unit.convert_seconds(elapsed_seconds).to_string();
        debug!(job = job_id, session = %handle, elapsed_seconds, bytes = report.len(), "closing session");

        let resp = self
            .http
            .post(self.endpoint(STOP_PATH))
            .query(&[
                ("studyrecordAutoid", handle.as_str()),
                ("minutes", elapsed.as_str()),
                ("score", self.service.score.as_str()),
                ("key", self.service.key.as_str()),
            ])
            .header(ACCEPT, "*/*")
            .header(EXPECT, "100-continue")
            .form(&[("report", report.as_str())])
            .send()
            .await?;

        let ack = success_body(resp, "close").await?;
        info!(job = job_id, session = %handle, "session closed");
        Ok(CloseAck(ack))
    }
}
