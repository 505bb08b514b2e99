use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Page fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default = "default_report_base_url")]
    pub report_base_url: String,

    #[serde(default = "default_schedule_base_url")]
    pub schedule_base_url: String,

    /// Stats REST API serving shift charts.
    #[serde(default = "default_shift_base_url")]
    pub shift_base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Extra attempts for transient failures (network, timeout, 429, 5xx).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Fail a unit on any schema violation instead of attaching the report.
    #[serde(default)]
    pub strict: bool,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Largest tolerated share of failed rows per page. `1.0` only rejects
    /// pages where every row failed.
    #[serde(default = "default_max_row_failure_ratio")]
    pub max_row_failure_ratio: f64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub csv_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_report_base_url() -> String {
    "https://www.nhl.com/scores/htmlreports".to_string()
}
fn default_schedule_base_url() -> String {
    "https://statsapi.web.nhl.com/api/v1".to_string()
}
fn default_shift_base_url() -> String {
    "https://api.nhle.com/stats/rest/en".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1500
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_ms() -> u64 {
    500
}
fn default_user_agent() -> String {
    "hockey-etl/0.1 (research project; game report statistics)".to_string()
}
fn default_concurrency() -> usize {
    1
}
fn default_max_row_failure_ratio() -> f64 {
    1.0
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/hockey.duckdb")
}
fn default_true() -> bool {
    true
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            report_base_url: default_report_base_url(),
            schedule_base_url: default_schedule_base_url(),
            shift_base_url: default_shift_base_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict: false,
            concurrency: default_concurrency(),
            max_row_failure_ratio: default_max_row_failure_ratio(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            csv_dir: None,
            run_migrations: true,
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("HOCKEY").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.pipeline.concurrency >= 1,
            "pipeline.concurrency must be at least 1"
        );
        ensure!(
            (0.0..=1.0).contains(&self.pipeline.max_row_failure_ratio),
            "pipeline.max_row_failure_ratio must be within [0, 1], got {}",
            self.pipeline.max_row_failure_ratio
        );
        for (key, value) in [
            ("report_base_url", &self.fetcher.report_base_url),
            ("schedule_base_url", &self.fetcher.schedule_base_url),
            ("shift_base_url", &self.fetcher.shift_base_url),
        ] {
            url::Url::parse(value).with_context(|| format!("Bad fetcher.{} {:?}", key, value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.pipeline.concurrency, 1);
        assert!(!cfg.pipeline.strict);
        assert_eq!(cfg.pipeline.max_row_failure_ratio, 1.0);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[pipeline]\nstrict = true\n[fetcher]\nmax_retries = 0\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(cfg.pipeline.strict);
        assert_eq!(cfg.pipeline.concurrency, 1);
        assert_eq!(cfg.fetcher.max_retries, 0);
        assert_eq!(cfg.fetcher.timeout_secs, 30);
        assert_eq!(cfg.storage.db_path, PathBuf::from("data/hockey.duckdb"));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.pipeline.concurrency = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.pipeline.max_row_failure_ratio = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.fetcher.report_base_url = "not a url".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.fetcher.shift_base_url = "api.nhle.com".into();
        assert!(cfg.validate().is_err());
    }
}
