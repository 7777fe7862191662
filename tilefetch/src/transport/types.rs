//! Request, response and error types shared by all transports.

use chrono::DateTime;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

/// Errors raised before a response is available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// Connecting to the server failed
    #[error("Connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    /// The connect or read timeout elapsed
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Any other request failure
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// A single tile GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    /// Absolute tile URL
    pub url: String,
    /// Request headers, in the order they should be sent
    pub headers: Vec<(String, String)>,
    /// Connect timeout; zero means the transport default
    pub connect_timeout: Duration,
    /// Deadline for the whole request, from connect to the last body byte;
    /// zero means the transport default
    pub read_timeout: Duration,
    /// Ask intermediate HTTP caches not to answer this request
    pub bypass_cache: bool,
}

impl TileRequest {
    /// Create a request with no headers and default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            connect_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
            bypass_cache: false,
        }
    }

    /// Headers to put on the wire, including the cache-busting pair for
    /// forced requests.
    pub fn effective_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        if self.bypass_cache {
            headers.retain(|(name, _)| {
                !name.eq_ignore_ascii_case("cache-control") && !name.eq_ignore_ascii_case("pragma")
            });
            headers.push(("Cache-Control".to_string(), "no-cache".to_string()));
            headers.push(("Pragma".to_string(), "no-cache".to_string()));
        }
        headers
    }
}

/// Response whose headers are available before the body is read.
pub struct TileResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Box<dyn Read + Send>,
}

impl TileResponse {
    /// Create a response with no headers.
    pub fn new(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Box::new(body),
        }
    }

    /// Add a header. Names are case-insensitive.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `Expires` header as epoch milliseconds.
    ///
    /// Missing, unparseable and zero values all yield `None`.
    pub fn expiration(&self) -> Option<i64> {
        let value = self.header("expires")?;
        DateTime::parse_from_rfc2822(value.trim())
            .ok()
            .map(|date| date.timestamp_millis())
            .filter(|millis| *millis != 0)
    }

    /// Take the body stream.
    pub fn into_body(self) -> Box<dyn Read + Send> {
        self.body
    }
}

impl fmt::Debug for TileResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::empty;

    #[test]
    fn test_effective_headers_plain() {
        let mut request = TileRequest::new("http://example.com/1/0/0.png");
        request.headers.push(("Accept".to_string(), "image/png".to_string()));
        assert_eq!(request.effective_headers(), request.headers);
    }

    #[test]
    fn test_effective_headers_bypass_cache() {
        let mut request = TileRequest::new("http://example.com/1/0/0.png");
        request
            .headers
            .push(("cache-control".to_string(), "max-age=60".to_string()));
        request.bypass_cache = true;

        let headers = request.effective_headers();
        assert_eq!(
            headers,
            vec![
                ("Cache-Control".to_string(), "no-cache".to_string()),
                ("Pragma".to_string(), "no-cache".to_string()),
            ]
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = TileResponse::new(200, empty()).with_header("X-VE-Tile-Info", "no-tile");
        assert_eq!(response.header("x-ve-tile-info"), Some("no-tile"));
        assert_eq!(response.header("X-VE-TILE-INFO"), Some("no-tile"));
        assert_eq!(response.header("Expires"), None);
    }

    #[test]
    fn test_is_success() {
        assert!(TileResponse::new(200, empty()).is_success());
        assert!(TileResponse::new(204, empty()).is_success());
        assert!(!TileResponse::new(304, empty()).is_success());
        assert!(!TileResponse::new(404, empty()).is_success());
    }

    #[test]
    fn test_expiration_parses_http_date() {
        let response =
            TileResponse::new(200, empty()).with_header("Expires", "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(response.expiration(), Some(1_445_412_480_000));
    }

    #[test]
    fn test_expiration_invalid_or_zero() {
        let response = TileResponse::new(200, empty()).with_header("Expires", "0");
        assert_eq!(response.expiration(), None);

        let response =
            TileResponse::new(200, empty()).with_header("Expires", "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(response.expiration(), None);

        assert_eq!(TileResponse::new(200, empty()).expiration(), None);
    }
}
