//! Research job configuration.
//!
//! Every field defaults to the pipeline's fixed production limits, so
//! `ResearchConfig::default()` is the configuration callers normally want.
//! A TOML file may override any subset of fields.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteScoutError};

/// Desktop-browser User-Agent sent with every page request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level configuration for one research job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum fetches in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Stop dispatching once this many pages fetched successfully.
    #[serde(default = "default_max_successful")]
    pub max_successful: usize,

    /// Maximum number of candidate URLs dispatched per job.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Hard wall-clock budget for the whole job, in milliseconds.
    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,

    /// URL scheme used for candidate URLs (`https`, or `http` for local mocks).
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Per-page fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_successful: default_max_successful(),
            max_attempts: default_max_attempts(),
            job_timeout_ms: default_job_timeout_ms(),
            scheme: default_scheme(),
            fetch: FetchConfig::default(),
        }
    }
}

fn default_max_concurrent() -> usize {
    2
}
fn default_max_successful() -> usize {
    4
}
fn default_max_attempts() -> usize {
    6
}
fn default_job_timeout_ms() -> u64 {
    30_000
}
fn default_scheme() -> String {
    "https".into()
}

/// `[fetch]` section: limits for a single page request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-attempt request timeout in milliseconds (headers and body).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Maximum streamed body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Retries after the first attempt for `failed`/`timeout` outcomes.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds; doubles per retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on the un-jittered backoff delay in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_max_body_bytes() -> usize {
    1_572_864
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    1_000
}
fn default_backoff_max_ms() -> u64 {
    4_000
}
fn default_max_redirects() -> usize {
    5
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

// ---------------------------------------------------------------------------
// Accessors and validation
// ---------------------------------------------------------------------------

impl ResearchConfig {
    /// The job deadline as a [`Duration`].
    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }

    /// Parse a (possibly partial) TOML document; missing fields keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SiteScoutError::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make a job unable to do any work.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(SiteScoutError::config("max_concurrent must be at least 1"));
        }
        if self.max_successful == 0 {
            return Err(SiteScoutError::config("max_successful must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(SiteScoutError::config("max_attempts must be at least 1"));
        }
        if self.job_timeout_ms == 0 || self.fetch.request_timeout_ms == 0 {
            return Err(SiteScoutError::config("timeouts must be non-zero"));
        }
        if self.fetch.max_body_bytes == 0 {
            return Err(SiteScoutError::config("max_body_bytes must be non-zero"));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(SiteScoutError::config(format!(
                "unsupported scheme {:?}, expected http or https",
                self.scheme
            )));
        }
        Ok(())
    }
}

impl FetchConfig {
    /// The per-attempt timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The first backoff delay as a [`Duration`].
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// The backoff ceiling as a [`Duration`].
    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load a research config from a TOML file.
pub fn load_config_from(path: &Path) -> Result<ResearchConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteScoutError::io(path, e))?;

    let config = ResearchConfig::from_toml_str(&content).map_err(|e| match e {
        SiteScoutError::Config { message } => {
            SiteScoutError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;
    tracing::debug!(?path, "loaded research config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_limits() {
        let config = ResearchConfig::default();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.max_successful, 4);
        assert_eq!(config.max_attempts, 6);
        assert_eq!(config.job_timeout(), Duration::from_secs(30));
        assert_eq!(config.scheme, "https");
        assert_eq!(config.fetch.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.fetch.max_body_bytes, 1_572_864);
        assert_eq!(config.fetch.max_retries, 2);
        assert_eq!(config.fetch.backoff_base(), Duration::from_secs(1));
        assert_eq!(config.fetch.backoff_max(), Duration::from_secs(4));
        assert!(config.fetch.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml_str = r#"
max_concurrent = 3
scheme = "http"

[fetch]
max_retries = 0
"#;
        let config = ResearchConfig::from_toml_str(toml_str).expect("parse");
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.max_successful, 4);
        assert_eq!(config.scheme, "http");
        assert_eq!(config.fetch.max_retries, 0);
        assert_eq!(config.fetch.request_timeout_ms, 10_000);
    }

    #[test]
    fn empty_toml_is_default() {
        let config = ResearchConfig::from_toml_str("").expect("parse");
        assert_eq!(config.max_attempts, 6);
        assert_eq!(config.fetch.backoff_max_ms, 4_000);
    }

    #[test]
    fn config_roundtrip() {
        let config = ResearchConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed = ResearchConfig::from_toml_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.job_timeout_ms, 30_000);
        assert_eq!(parsed.fetch.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn zero_limits_rejected() {
        let err = ResearchConfig::from_toml_str("max_concurrent = 0").unwrap_err();
        assert!(err.to_string().contains("max_concurrent"));

        let mut config = ResearchConfig::default();
        config.scheme = "ftp".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("sitescout-missing-config-test.toml");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, SiteScoutError::Io { .. }));
    }

    #[test]
    fn file_errors_match_string_errors_with_path_prefix() {
        let path = std::env::temp_dir().join(format!(
            "sitescout-bad-config-{}.toml",
            std::process::id()
        ));

        std::fs::write(&path, "max_concurrent = \"two\"").unwrap();
        let from_file = load_config_from(&path).unwrap_err().to_string();
        let from_str = ResearchConfig::from_toml_str("max_concurrent = \"two\"")
            .unwrap_err()
            .to_string();
        assert!(from_file.contains(&path.display().to_string()), "{from_file}");
        assert!(from_file.contains("invalid config"), "{from_file}");
        assert!(from_str.contains("invalid config"), "{from_str}");

        std::fs::write(&path, "max_attempts = 0").unwrap();
        let err = load_config_from(&path).unwrap_err().to_string();
        assert!(err.contains(&path.display().to_string()), "{err}");
        assert!(err.contains("max_attempts must be at least 1"), "{err}");

        std::fs::write(&path, "max_attempts = 3").unwrap();
        assert_eq!(load_config_from(&path).unwrap().max_attempts, 3);

        let _ = std::fs::remove_file(&path);
    }
}
