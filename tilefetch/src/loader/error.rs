//! Errors raised while fetching a single tile.

use crate::decode::DecodeError;
use crate::transport::TransportError;
use std::io;
use thiserror::Error;

/// Failure of one fetch attempt.
///
/// These never escape the loader; the message ends up in the tile's failed
/// status and the listener is told the load did not succeed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or timed out
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Reading the response body failed
    #[error("Failed reading response body: {0}")]
    Body(#[source] io::Error),

    /// The provider reported that no imagery exists for this tile
    #[error("No tile at this zoom level")]
    NoTile,

    /// The tile bytes could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FetchError {
    /// Whether a stale cache entry may stand in for this failure.
    pub fn allows_stale_fallback(&self) -> bool {
        !matches!(self, FetchError::NoTile)
    }
}
