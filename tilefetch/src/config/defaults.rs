//! Default values and limits for loader configuration.

use std::path::PathBuf;

/// Default `Accept` header.
pub const DEFAULT_ACCEPT: &str = "text/html, image/png, image/jpeg, image/gif, */*";

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("tilefetch/", env!("CARGO_PKG_VERSION"));

/// Default number of concurrent tile fetches.
pub const DEFAULT_CONCURRENT_CONNECTIONS: usize = 3;

/// Lower bound for concurrent tile fetches.
pub const MIN_CONCURRENT_CONNECTIONS: usize = 1;

/// Upper bound for concurrent tile fetches.
pub const MAX_CONCURRENT_CONNECTIONS: usize = 64;

/// Default cache freshness limit in days.
pub const DEFAULT_MAX_CACHE_AGE_DAYS: u32 = 28;

/// Default cache directory (`<platform cache dir>/tilefetch`).
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("tilefetch")
}

/// Clamps fetch concurrency to the valid range and logs a warning if clamped.
pub fn clamp_concurrent_connections(value: usize) -> usize {
    if value < MIN_CONCURRENT_CONNECTIONS {
        tracing::warn!(
            requested = value,
            min = MIN_CONCURRENT_CONNECTIONS,
            "concurrent connections below minimum, clamping to {}",
            MIN_CONCURRENT_CONNECTIONS
        );
        MIN_CONCURRENT_CONNECTIONS
    } else if value > MAX_CONCURRENT_CONNECTIONS {
        tracing::warn!(
            requested = value,
            max = MAX_CONCURRENT_CONNECTIONS,
            "concurrent connections above maximum, clamping to {}",
            MAX_CONCURRENT_CONNECTIONS
        );
        MAX_CONCURRENT_CONNECTIONS
    } else {
        value
    }
}
