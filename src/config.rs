//! Runtime configuration.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_STORAGE_PATH: &str = ".cache/storage.json";
const DEFAULT_LOG_DIR: &str = ".logs";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub default_headers: BTreeMap<String, String>,
    pub storage_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            default_headers,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `STUDYBEAT_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("STUDYBEAT_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = env::var("STUDYBEAT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_millis(ms);
        }
        if let Ok(path) = env::var("STUDYBEAT_STORAGE") {
            config.storage_path = PathBuf::from(path);
        }
        if let Ok(dir) = env::var("STUDYBEAT_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(
            config.default_headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }
}
