//! reqwest-backed blocking transport.

use super::types::{TileRequest, TileResponse, TransportError};
use super::Transport;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Blocking HTTP transport using reqwest.
///
/// The connect timeout is a client-level setting in reqwest, so the client is
/// rebuilt whenever a request asks for a different one; only the most recent
/// client is kept. The read timeout becomes reqwest's per-request timeout,
/// which bounds the whole request (connect, headers and body), not the gap
/// between reads.
#[derive(Default)]
pub struct ReqwestTransport {
    client: Mutex<Option<(Duration, Client)>>,
}

impl ReqwestTransport {
    /// Creates a transport; clients are built on first use.
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, connect_timeout: Duration) -> Result<Client, TransportError> {
        let mut current = self.client.lock();
        if let Some((timeout, client)) = current.as_ref() {
            if *timeout == connect_timeout {
                return Ok(client.clone());
            }
        }

        let mut builder = Client::builder();
        if !connect_timeout.is_zero() {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        debug!(connect_timeout_ms = connect_timeout.as_millis() as u64, "Built HTTP client");
        *current = Some((connect_timeout, client.clone()));
        Ok(client)
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, request: &TileRequest) -> Result<TileResponse, TransportError> {
        let client = self.client(request.connect_timeout)?;

        let mut builder = client.get(&request.url);
        for (name, value) in request.effective_headers() {
            builder = builder.header(name, value);
        }
        if !request.read_timeout.is_zero() {
            builder = builder.timeout(request.read_timeout);
        }

        trace!(url = %request.url, bypass_cache = request.bypass_cache, "HTTP GET request starting");

        let response = match builder.send() {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    url = %request.url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(classify(&request.url, &e));
            }
        };

        let status = response.status().as_u16();
        debug!(url = %request.url, status, "HTTP response received");

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let mut tile_response = TileResponse::new(status, response);
        for (name, value) in headers {
            tile_response = tile_response.with_header(&name, value);
        }
        Ok(tile_response)
    }
}

fn classify(url: &str, error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_client_kept() {
        let transport = ReqwestTransport::new();
        let current = |transport: &ReqwestTransport| {
            transport.client.lock().as_ref().map(|(timeout, _)| *timeout)
        };

        transport.client(Duration::ZERO).unwrap();
        transport.client(Duration::ZERO).unwrap();
        assert_eq!(current(&transport), Some(Duration::ZERO));

        transport.client(Duration::from_secs(5)).unwrap();
        assert_eq!(current(&transport), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_connection_refused_is_reported() {
        // Port 9 on localhost is the discard service and is closed almost everywhere
        let transport = ReqwestTransport::new();
        let mut request = TileRequest::new("http://127.0.0.1:9/0/0/0.png");
        request.connect_timeout = Duration::from_secs(2);
        request.read_timeout = Duration::from_secs(2);

        let result = transport.get(&request);
        assert!(result.is_err());
    }
}
