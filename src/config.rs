//! Configuration file handling
//!
//! Settings are read from `config.toml` in the XDG config directory
//! (`~/.config/iotdash/` on Linux) or from a path given on the command line.
//! A missing default file simply means defaults.

use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::api::DEFAULT_BASE_URL;
use crate::cache::{CacheKey, TtlPolicy};

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file couldn't be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file isn't valid TOML for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `[ttl]` entry names something that isn't a cache key
    #[error("Unknown cache key in [ttl]: '{0}'")]
    UnknownCacheKey(String),

    /// A `[ttl]` entry targets a key that is exempt from expiry
    #[error("Cache key '{0}' has no TTL and cannot be overridden")]
    UntrackedCacheKey(String),

    /// An interval or timeout was set to zero
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Backend location, e.g. `https://console.example.com`
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Seconds between dashboard reads in watch mode
    pub watch_interval_secs: u64,
    /// TTL overrides in seconds, keyed by cache key name
    pub ttl: HashMap<String, u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            request_timeout_secs: 10,
            watch_interval_secs: 30,
            ttl: HashMap::new(),
        }
    }
}

impl Config {
    /// Path of the default config file, if a home directory can be found
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "iotdash")?;
        Some(project_dirs.config_dir().join("config.toml"))
    }

    /// Loads configuration from `path`, or from the default location when
    /// `path` is `None`
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Reads and validates a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("request_timeout_secs"));
        }
        if self.watch_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration("watch_interval_secs"));
        }
        self.ttl_overrides().map(|_| ())
    }

    /// Resolves `[ttl]` entries to cache keys
    pub fn ttl_overrides(&self) -> Result<HashMap<CacheKey, Duration>, ConfigError> {
        let mut overrides = HashMap::new();
        for (name, secs) in &self.ttl {
            let key = CacheKey::from_name(name)
                .ok_or_else(|| ConfigError::UnknownCacheKey(name.clone()))?;
            if key.default_ttl().is_none() {
                return Err(ConfigError::UntrackedCacheKey(name.clone()));
            }
            overrides.insert(key, Duration::from_secs(*secs));
        }
        Ok(overrides)
    }

    /// Builds the TTL table with overrides applied
    pub fn ttl_policy(&self) -> Result<TtlPolicy, ConfigError> {
        Ok(TtlPolicy::with_overrides(&self.ttl_overrides()?))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_full_file_is_parsed() {
        let config = Config::from_toml(
            r#"
            base_url = "https://console.example.com"
            token = "abc"
            request_timeout_secs = 5
            watch_interval_secs = 15

            [ttl]
            mqttStats = 10
            devices = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://console.example.com");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.watch_interval(), Duration::from_secs(15));

        let policy = config.ttl_policy().unwrap();
        assert_eq!(policy.duration_for(CacheKey::MqttStats), Some(Duration::from_secs(10)));
        assert_eq!(policy.duration_for(CacheKey::Devices), Some(Duration::from_secs(60)));
        assert_eq!(policy.duration_for(CacheKey::Profile), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_unknown_ttl_key_is_rejected() {
        let err = Config::from_toml("[ttl]\nwidgets = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCacheKey(ref name) if name == "widgets"));
    }

    #[test]
    fn test_overview_stats_ttl_is_rejected() {
        let err = Config::from_toml("[ttl]\noverviewStats = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::UntrackedCacheKey(_)));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = Config::from_toml("watch_interval_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("watch_interval_secs"));
    }

    #[test]
    fn test_unknown_field_is_a_parse_error() {
        let err = Config::from_toml("colour = \"blue\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_reads_explicit_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "base_url = \"http://backend:9000\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.base_url, "http://backend:9000");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("absent.toml");

        let err = Config::load(Some(&path)).unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
