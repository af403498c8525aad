use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use grabber_logging::grabber_info;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::FetchSettings;
use crate::wait::PollSettings;

pub const DEFAULT_BASE_URL: &str = "https://steamdb.info/";
pub const DEFAULT_STATE_FILE: &str = ".grabber_state.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("invalid base url {url:?}: {message}")]
    BaseUrl { url: String, message: String },
}

/// Engine settings, loadable from a ron file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub state_path: PathBuf,
    /// How often the coordinator re-checks the visit guard.
    pub poll_interval: Duration,
    /// How long a patchnotes page may take to render the versions list.
    pub extraction_timeout: Duration,
    /// How long the coordinator waits for one visit to close.
    pub visit_timeout: Duration,
    /// Refetch period used to observe page changes over HTTP.
    pub mutation_refresh: Duration,
    pub fetch: FetchSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::default_with_output(PathBuf::from("."))
    }
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir,
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            poll_interval: Duration::from_secs(1),
            extraction_timeout: Duration::from_secs(20),
            visit_timeout: Duration::from_secs(120),
            mutation_refresh: Duration::from_secs(2),
            fetch: FetchSettings::default(),
        }
    }

    /// Load `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                grabber_info!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The site root, always ending in `/` so relative joins stay under it.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|err| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            message: err.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::BaseUrl {
                url: self.base_url.clone(),
                message: "not a hierarchical url".to_string(),
            });
        }
        Ok(url)
    }

    pub fn visit_poll(&self) -> PollSettings {
        PollSettings {
            interval: self.poll_interval,
            timeout: self.visit_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_keeps_defaults() {
        let config: EngineConfig =
            ron::from_str("(base_url: \"http://localhost:8080\", poll_interval: (secs: 0, nanos: 5000000))")
                .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.extraction_timeout, Duration::from_secs(20));
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn base_url_must_parse() {
        let config = EngineConfig {
            base_url: "not a url".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(config.base_url(), Err(ConfigError::BaseUrl { .. })));
    }
}
