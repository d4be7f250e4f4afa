use encoding_rs::Encoding;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model::Catalog;

pub const DEFAULT_SCORE: &str = "1000003";
pub const DEFAULT_REPORT_ENCODING: &str = "gb2312";
pub const DEFAULT_REPORTS_DIR: &str = "reports";
/// Longest nominal active or rest time a catalog entry may declare.
pub const MAX_NOMINAL_SECONDS: u64 = 366 * 24 * 60 * 60;

pub fn labrun_root() -> PathBuf {
    match std::env::var("LABRUN_ROOT") {
        Ok(s) if !s.is_empty() => PathBuf::from(s),
        _ => PathBuf::from("."),
    }
}

pub fn config_file_path() -> PathBuf {
    let mut root = labrun_root();
    root.push("config.json");
    root
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub username: String,
    pub user_id: String,
    pub theme_id: String,
}

impl Identity {
    /// Composite account id sent with every open request.
    pub fn account_id(&self) -> String {
        format!("{},{}", self.user_id, self.theme_id)
    }
}

/// Unit of the elapsed value on the close request. The report template
/// always receives seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElapsedUnit {
    #[default]
    Minutes,
    Seconds,
}

impl ElapsedUnit {
    pub fn convert_seconds(self, seconds: u64) -> u64 {
        match self {
            ElapsedUnit::Minutes => seconds / 60,
            ElapsedUnit::Seconds => seconds,
        }
    }
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub key: String,
    pub score: String,
    pub elapsed_unit: ElapsedUnit,
    pub request_timeout: Option<Duration>,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("key", &"<redacted>")
            .field("score", &self.score)
            .field("elapsed_unit", &self.elapsed_unit)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub dir: PathBuf,
    pub encoding: &'static Encoding,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub identity: Identity,
    pub service: ServiceConfig,
    pub reports: ReportConfig,
    pub catalog: Catalog,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    identity: RawIdentity,
    service: RawService,
    reports: RawReports,
    catalog: Option<Catalog>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIdentity {
    name: Option<String>,
    username: Option<String>,
    user_id: Option<String>,
    theme_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawService {
    base_url: Option<String>,
    key: Option<String>,
    score: Option<String>,
    elapsed_unit: Option<ElapsedUnit>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawReports {
    dir: Option<PathBuf>,
    encoding: Option<String>,
}

fn required(value: Option<String>, field: &str, missing: &mut Vec<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(field.to_string());
            String::new()
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json_str(&data, base_dir)
    }

    /// Parse and validate. Relative report directories resolve against `base_dir`.
    pub fn from_json_str(data: &str, base_dir: &Path) -> Result<Self> {
        let raw: RawConfig =
            serde_json::from_str(data).map_err(|e| Error::Config(format!("invalid config: {}", e)))?;

        let mut missing = Vec::new();
        let identity = Identity {
            name: required(raw.identity.name, "identity.name", &mut missing),
            username: required(raw.identity.username, "identity.username", &mut missing),
            user_id: required(raw.identity.user_id, "identity.user_id", &mut missing),
            theme_id: required(raw.identity.theme_id, "identity.theme_id", &mut missing),
        };
        let base_url = required(raw.service.base_url, "service.base_url", &mut missing);
        let key = required(raw.service.key, "service.key", &mut missing);
        let catalog = match raw.catalog {
            Some(c) if !c.is_empty() => c,
            _ => {
                missing.push("catalog".to_string());
                Catalog::default()
            }
        };
        if !missing.is_empty() {
            return Err(Error::MissingConfig(missing));
        }

        let label = raw
            .reports
            .encoding
            .unwrap_or_else(|| DEFAULT_REPORT_ENCODING.to_string());
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| Error::Config(format!("unknown report encoding '{}'", label)))?;

        let dir = raw
            .reports
            .dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR));
        let dir = if dir.is_relative() { base_dir.join(dir) } else { dir };

        if let Some((_, _, bad)) = catalog.entries().find(|(_, _, e)| e.id.trim().is_empty()) {
            return Err(Error::Config(format!("experiment '{}' has an empty id", bad.name)));
        }
        if let Some((_, _, long)) = catalog
            .entries()
            .find(|(_, _, e)| e.total_time > MAX_NOMINAL_SECONDS || e.sleep_time > MAX_NOMINAL_SECONDS)
        {
            return Err(Error::Config(format!(
                "experiment '{}' exceeds the maximum duration of {} seconds",
                long.id, MAX_NOMINAL_SECONDS
            )));
        }

        Ok(Self {
            identity,
            service: ServiceConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                key,
                score: raw.service.score.unwrap_or_else(|| DEFAULT_SCORE.to_string()),
                elapsed_unit: raw.service.elapsed_unit.unwrap_or_default(),
                request_timeout: raw.service.request_timeout_secs.map(Duration::from_secs),
            },
            reports: ReportConfig { dir, encoding },
            catalog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn full_config() -> serde_json::Value {
        json!({
            "identity": {
                "name": "Li Lei",
                "username": "lilei",
                "user_id": "1001",
                "theme_id": "77"
            },
            "service": {
                "base_url": "http://sim.example/server/",
                "key": "SECRET"
            },
            "catalog": [
                {
                    "category": "Basics",
                    "experiments": [
                        { "id": "5", "name": "Intro", "total_time": 60, "sleep_time": 10 }
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_labrun_root_default() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LABRUN_ROOT", "");
        assert_eq!(labrun_root(), PathBuf::from("."));
    }

    #[test]
    fn test_config_file_path_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LABRUN_ROOT", "/tmp/labrun-custom");
        let path = config_file_path();
        assert_eq!(path, PathBuf::from("/tmp/labrun-custom/config.json"));
        env::remove_var("LABRUN_ROOT");
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_json_str(&full_config().to_string(), Path::new("/srv/lab")).unwrap();

        assert_eq!(config.identity.account_id(), "1001,77");
        assert_eq!(config.service.base_url, "http://sim.example/server");
        assert_eq!(config.service.score, DEFAULT_SCORE);
        assert_eq!(config.service.elapsed_unit, ElapsedUnit::Minutes);
        assert!(config.service.request_timeout.is_none());
        assert_eq!(config.reports.dir, PathBuf::from("/srv/lab/reports"));
        // gb2312 is served by the GBK decoder
        assert_eq!(config.reports.encoding, encoding_rs::GBK);
        assert_eq!(config.catalog.len(), 1);
    }

    #[test]
    fn test_missing_fields_are_all_listed() {
        let data = json!({
            "identity": { "name": "Li Lei", "username": "  " },
            "service": { "base_url": "http://sim.example" }
        });
        let err = Config::from_json_str(&data.to_string(), Path::new(".")).unwrap_err();
        match err {
            Error::MissingConfig(fields) => assert_eq!(
                fields,
                vec![
                    "identity.username",
                    "identity.user_id",
                    "identity.theme_id",
                    "service.key",
                    "catalog",
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let mut data = full_config();
        data["reports"] = json!({ "encoding": "klingon-8" });
        let err = Config::from_json_str(&data.to_string(), Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("klingon-8")));
    }

    #[test]
    fn test_explicit_service_options() {
        let mut data = full_config();
        data["service"]["elapsed_unit"] = json!("seconds");
        data["service"]["score"] = json!("42");
        data["service"]["request_timeout_secs"] = json!(15);
        data["reports"] = json!({ "dir": "/var/reports", "encoding": "utf-8" });

        let config = Config::from_json_str(&data.to_string(), Path::new("/ignored")).unwrap();
        assert_eq!(config.service.elapsed_unit, ElapsedUnit::Seconds);
        assert_eq!(config.service.score, "42");
        assert_eq!(config.service.request_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.reports.dir, PathBuf::from("/var/reports"));
        assert_eq!(config.reports.encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn test_oversized_duration_rejected() {
        let mut data = full_config();
        data["catalog"][0]["experiments"][0]["total_time"] = json!(10_000_000_000_000_000u64);
        let err = Config::from_json_str(&data.to_string(), Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("'5'")));

        let mut data = full_config();
        data["catalog"][0]["experiments"][0]["sleep_time"] = json!(MAX_NOMINAL_SECONDS + 1);
        let err = Config::from_json_str(&data.to_string(), Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_duration_at_limit_accepted() {
        let mut data = full_config();
        data["catalog"][0]["experiments"][0]["total_time"] = json!(MAX_NOMINAL_SECONDS);
        data["catalog"][0]["experiments"][0]["sleep_time"] = json!(MAX_NOMINAL_SECONDS);
        let config = Config::from_json_str(&data.to_string(), Path::new(".")).unwrap();
        assert_eq!(config.catalog.categories[0].experiments[0].total_time, MAX_NOMINAL_SECONDS);
    }

    #[test]
    fn test_elapsed_unit_conversion() {
        assert_eq!(ElapsedUnit::Minutes.convert_seconds(119), 1);
        assert_eq!(ElapsedUnit::Minutes.convert_seconds(59), 0);
        assert_eq!(ElapsedUnit::Seconds.convert_seconds(119), 119);
    }

    #[test]
    fn test_key_is_redacted_in_debug() {
        let config = Config::from_json_str(&full_config().to_string(), Path::new(".")).unwrap();
        let dump = format!("{:?}", config.service);
        assert!(!dump.contains("SECRET"));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("config.json");
        std::fs::write(&path, full_config().to_string()).unwrap();

        let config = Config::load(&path).expect("load config");
        assert_eq!(config.reports.dir, tmp.path().join("reports"));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let err = Config::load(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = Config::from_json_str("{ not json", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
