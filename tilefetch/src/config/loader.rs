//! Tile loader configuration.

use super::defaults::{
    clamp_concurrent_connections, default_cache_dir, DEFAULT_ACCEPT,
    DEFAULT_CONCURRENT_CONNECTIONS, DEFAULT_MAX_CACHE_AGE_DAYS, DEFAULT_USER_AGENT,
};
use crate::transport::TileRequest;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a [`TileLoader`](crate::loader::TileLoader).
///
/// Header names are case-insensitive: setting `user-agent` replaces the
/// default `User-Agent`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tilefetch::config::LoaderConfig;
///
/// let config = LoaderConfig::new()
///     .with_header("User-Agent", "my-viewer/1.0")
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_concurrent_connections(4);
///
/// assert_eq!(config.header("user-agent"), Some("my-viewer/1.0"));
/// assert_eq!(config.concurrent_connections(), 4);
/// assert_eq!(config.read_timeout(), Duration::ZERO);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Request headers, unique by case-insensitive name
    headers: Vec<(String, String)>,
    /// Connect timeout (zero = transport default)
    connect_timeout: Duration,
    /// Read timeout (zero = transport default)
    read_timeout: Duration,
    /// Worker pool size
    concurrent_connections: usize,
    /// Disk cache root
    cache_dir: PathBuf,
    /// Disk cache freshness limit
    max_cache_age: Duration,
}

impl LoaderConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Add or replace several request headers.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.set_header(name, value);
        }
        self
    }

    /// Set the connect timeout. Zero uses the transport default.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout. Zero uses the transport default.
    ///
    /// With [`ReqwestTransport`](crate::transport::ReqwestTransport) this is a
    /// deadline for the whole request including the body, not an idle timeout
    /// between reads.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the number of concurrent fetches (clamped to 1-64).
    pub fn with_concurrent_connections(mut self, connections: usize) -> Self {
        self.set_concurrent_connections(connections);
        self
    }

    /// Set the disk cache root.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Set the disk cache freshness limit.
    pub fn with_max_cache_age(mut self, max_age: Duration) -> Self {
        self.max_cache_age = max_age;
        self
    }

    /// Add or replace a request header in place.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.headers.push((name, value)),
        }
    }

    /// Remove a request header, returning its value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let index = self
            .headers
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))?;
        Some(self.headers.remove(index).1)
    }

    /// Set the connect timeout in place.
    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    /// Set the read timeout in place.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Set the number of concurrent fetches in place (clamped to 1-64).
    pub fn set_concurrent_connections(&mut self, connections: usize) {
        self.concurrent_connections = clamp_concurrent_connections(connections);
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All request headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Get the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get the read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Get the number of concurrent fetches.
    pub fn concurrent_connections(&self) -> usize {
        self.concurrent_connections
    }

    /// Get the disk cache root.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the disk cache freshness limit.
    pub fn max_cache_age(&self) -> Duration {
        self.max_cache_age
    }

    /// Build the request for `url` with the current headers and timeouts.
    pub fn request_for(&self, url: impl Into<String>, bypass_cache: bool) -> TileRequest {
        TileRequest {
            url: url.into(),
            headers: self.headers.clone(),
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            bypass_cache,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            headers: vec![
                ("Accept".to_string(), DEFAULT_ACCEPT.to_string()),
                ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
            ],
            connect_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
            concurrent_connections: DEFAULT_CONCURRENT_CONNECTIONS,
            cache_dir: default_cache_dir(),
            max_cache_age: Duration::from_secs(u64::from(DEFAULT_MAX_CACHE_AGE_DAYS) * 24 * 60 * 60),
        }
    }
}
