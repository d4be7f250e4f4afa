use encoding_rs::Encoding;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::Identity;
use crate::error::{Error, Result};

pub const NAME_PLACEHOLDER: &str = "{name}";
pub const USERNAME_PLACEHOLDER: &str = "{username}";
pub const RUN_TIME_PLACEHOLDER: &str = "{run_time}";

pub fn template_path(dir: &Path, job_id: &str) -> PathBuf {
    dir.join(format!("{}.xml", job_id))
}

/// A report exactly as stored on disk, decoded from its legacy encoding.
/// Loaded fresh for every close; rendering never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    job_id: String,
    text: String,
}

impl ReportTemplate {
    pub fn new(job_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            text: text.into(),
        }
    }

    pub fn load(dir: &Path, encoding: &'static Encoding, job_id: &str) -> Result<Self> {
        let path = template_path(dir, job_id);
        let bytes = std::fs::read(&path).map_err(|e| Error::ReportNotFound {
            id: job_id.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        let text = encoding
            .decode_without_bom_handling_and_without_replacement(&bytes)
            .ok_or_else(|| Error::ReportNotFound {
                id: job_id.to_string(),
                reason: format!("{} is not valid {}", path.display(), encoding.name()),
            })?;

        let template = Self::new(job_id, text.into_owned());
        let missing = template.missing_placeholders();
        if !missing.is_empty() {
            warn!(job = job_id, ?missing, "report template lacks placeholders");
        }
        Ok(template)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn missing_placeholders(&self) -> Vec<&'static str> {
        [NAME_PLACEHOLDER, USERNAME_PLACEHOLDER, RUN_TIME_PLACEHOLDER]
            .into_iter()
            .filter(|p| !self.text.contains(*p))
            .collect()
    }

    /// Substitute identity and elapsed seconds. The result is still
    /// percent-encoded where the template was.
    pub fn render(&self, identity: &Identity, elapsed_seconds: u64) -> String {
        self.text
            .replace(NAME_PLACEHOLDER, &identity.name)
            .replace(USERNAME_PLACEHOLDER, &identity.username)
            .replace(RUN_TIME_PLACEHOLDER, &elapsed_seconds.to_string())
    }

    /// Rendered and percent-decoded, ready to submit.
    pub fn to_report(&self, identity: &Identity, elapsed_seconds: u64) -> String {
        percent_decode_str(&self.render(identity, elapsed_seconds))
            .decode_utf8_lossy()
            .into_owned()
    }
}
