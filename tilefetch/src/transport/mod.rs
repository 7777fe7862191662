//! HTTP transport abstraction.
//!
//! Jobs talk to the network only through [`Transport`], so tests can swap in
//! a scripted implementation. A transport returns as soon as the response
//! headers are in; the body is streamed by the caller.
//!
//! ```ignore
//! use tilefetch::transport::{ReqwestTransport, TileRequest, Transport};
//!
//! let transport = ReqwestTransport::new();
//! let response = transport.get(&TileRequest::new("https://tile.openstreetmap.org/0/0/0.png"))?;
//! assert!(response.is_success());
//! ```

mod http;
#[cfg(test)]
mod mock;
mod types;

pub use http::ReqwestTransport;
pub use types::{TileRequest, TileResponse, TransportError};

#[cfg(test)]
pub(crate) use mock::{MockReply, MockTransport};

/// Performs tile GET requests.
///
/// Implementations must be callable from many pool workers at once.
pub trait Transport: Send + Sync {
    /// Send the request and return once headers are available.
    fn get(&self, request: &TileRequest) -> Result<TileResponse, TransportError>;
}
