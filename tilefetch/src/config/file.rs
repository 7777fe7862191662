//! Configuration file handling for ~/.tilefetch/config.ini.
//!
//! ```ini
//! [loader]
//! threads = 4
//! connect_timeout_ms = 5000
//! read_timeout_ms = 30000
//! user_agent = my-viewer/1.0
//!
//! [cache]
//! directory = ~/.cache/tilefetch
//! max_age_days = 28
//!
//! [headers]
//! Referer = https://example.org/
//! ```
//!
//! Parsing lives in [`super::parser`].

use super::defaults::{
    default_cache_dir, DEFAULT_CONCURRENT_CONNECTIONS, DEFAULT_MAX_CACHE_AGE_DAYS,
};
use super::loader::LoaderConfig;
use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Config text is not valid INI
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ini::ParseError),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(std::io::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[loader]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Concurrent fetches
    pub threads: usize,
    /// Connect timeout in milliseconds (0 = transport default)
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds (0 = transport default)
    pub read_timeout_ms: u64,
    /// User-Agent override
    pub user_agent: Option<String>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_CONCURRENT_CONNECTIONS,
            connect_timeout_ms: 0,
            read_timeout_ms: 0,
            user_agent: None,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Cache root directory
    pub directory: PathBuf,
    /// Freshness limit in days
    pub max_age_days: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            max_age_days: DEFAULT_MAX_CACHE_AGE_DAYS,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub loader: LoaderSettings,
    pub cache: CacheSettings,
    /// `[headers]` entries in file order
    pub headers: Vec<(String, String)>,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilefetch/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::WriteError)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("loader"))
            .set("threads", self.loader.threads.to_string())
            .set("connect_timeout_ms", self.loader.connect_timeout_ms.to_string())
            .set("read_timeout_ms", self.loader.read_timeout_ms.to_string());
        if let Some(user_agent) = &self.loader.user_agent {
            ini.with_section(Some("loader"))
                .set("user_agent", user_agent.as_str());
        }
        ini.with_section(Some("cache"))
            .set("directory", self.cache.directory.to_string_lossy())
            .set("max_age_days", self.cache.max_age_days.to_string());
        for (name, value) in &self.headers {
            ini.with_section(Some("headers"))
                .set(name.as_str(), value.as_str());
        }

        ini.write_to_file(path).map_err(ConfigFileError::WriteError)
    }

    /// Build a loader configuration from these settings.
    pub fn to_loader_config(&self) -> LoaderConfig {
        let mut config = LoaderConfig::new()
            .with_concurrent_connections(self.loader.threads)
            .with_connect_timeout(Duration::from_millis(self.loader.connect_timeout_ms))
            .with_read_timeout(Duration::from_millis(self.loader.read_timeout_ms))
            .with_cache_dir(self.cache.directory.clone())
            .with_max_cache_age(Duration::from_secs(
                u64::from(self.cache.max_age_days) * 24 * 60 * 60,
            ));

        if let Some(user_agent) = &self.loader.user_agent {
            config.set_header("User-Agent", user_agent.as_str());
        }
        for (name, value) in &self.headers {
            config.set_header(name.as_str(), value.as_str());
        }
        config
    }
}

/// Get the path to the config directory (~/.tilefetch).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilefetch")
}

/// Get the path to the config file (~/.tilefetch/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::DEFAULT_USER_AGENT;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.loader.threads, DEFAULT_CONCURRENT_CONNECTIONS);
        assert_eq!(config.loader.connect_timeout_ms, 0);
        assert!(config.loader.user_agent.is_none());
        assert_eq!(config.cache.max_age_days, 28);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_config_file_path() {
        assert!(config_file_path().ends_with(".tilefetch/config.ini"));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.loader.threads = 6;
        config.loader.read_timeout_ms = 2500;
        config.loader.user_agent = Some("viewer/3".to_string());
        config.cache.directory = temp_dir.path().join("tiles");
        config.cache.max_age_days = 7;
        config
            .headers
            .push(("Referer".to_string(), "https://example.org/".to_string()));

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_to_loader_config() {
        let mut config = ConfigFile::default();
        config.loader.threads = 5;
        config.loader.connect_timeout_ms = 1500;
        config.cache.directory = PathBuf::from("/var/tiles");
        config.cache.max_age_days = 1;

        let loader = config.to_loader_config();
        assert_eq!(loader.concurrent_connections(), 5);
        assert_eq!(loader.connect_timeout(), Duration::from_millis(1500));
        assert_eq!(loader.read_timeout(), Duration::ZERO);
        assert_eq!(loader.cache_dir(), Path::new("/var/tiles"));
        assert_eq!(loader.max_cache_age(), Duration::from_secs(86_400));
        assert_eq!(loader.header("User-Agent"), Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn test_header_section_overrides_user_agent() {
        let mut config = ConfigFile::default();
        config.loader.user_agent = Some("from-loader".to_string());
        config
            .headers
            .push(("user-agent".to_string(), "from-headers".to_string()));

        let loader = config.to_loader_config();
        assert_eq!(loader.header("User-Agent"), Some("from-headers"));
        assert_eq!(loader.headers().len(), 2);
    }
}
