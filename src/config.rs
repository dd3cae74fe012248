//! Client configuration
//!
//! Read from YAML, by default `<config_dir>/scribe/config.yaml`. Every key is
//! optional; a missing file yields the defaults.
//!
//! ```yaml
//! api:
//!   base_url: http://localhost:8000/api
//!   request_timeout_ms: 10000
//! analysis:
//!   poll_interval_ms: 3000
//!   max_poll_failures: 5
//! ```

use crate::analysis::AnalysisConfig;
use crate::service::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "SCRIBE_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub analysis: PollingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub poll_interval_ms: u64,
    pub max_poll_failures: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3_000,
            max_poll_failures: 5,
        }
    }
}

/// Default config location (~/.config/scribe/config.yaml on Linux)
pub fn default_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".config"));
    config_dir.join("scribe").join("config.yaml")
}

impl Config {
    /// Load from `path`; a missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Apply `SCRIBE_API_URL` if set.
    pub fn with_env(self) -> Self {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => self.with_base_url(url),
            _ => self,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig::default()
            .with_poll_interval(Duration::from_millis(self.analysis.poll_interval_ms))
            .with_max_poll_failures(self.analysis.max_poll_failures)
            .with_request_timeout(self.request_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "analysis:\n  poll_interval_ms: 500").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.analysis.poll_interval_ms, 500);
        assert_eq!(config.analysis.max_poll_failures, 5);
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn malformed_file_is_reported_with_its_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "api: [not, a, map]").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { ref path, .. } if path == file.path()));
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn analysis_config_converts_units() {
        let config = Config::parse(
            "api:\n  request_timeout_ms: 2500\nanalysis:\n  poll_interval_ms: 1000\n  max_poll_failures: 2\n",
        )
        .unwrap();
        let analysis = config.analysis_config();
        assert_eq!(analysis.poll_interval, Duration::from_secs(1));
        assert_eq!(analysis.max_poll_failures, 2);
        assert_eq!(analysis.request_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn base_url_override() {
        let config = Config::default().with_base_url("http://example.test/api");
        assert_eq!(config.api.base_url, "http://example.test/api");
    }

    #[test]
    fn default_path_ends_in_scribe_config() {
        assert!(default_path().ends_with("scribe/config.yaml"));
    }
}
