//! Tile metadata carried in provider response headers.

use crate::tile::{Tile, META_CAPTURE_DATE, META_EXPIRES, META_TILE_INFO, NO_TILE_SENTINEL};
use crate::transport::TileResponse;
use tracing::warn;

/// Capture-date range of aerial imagery.
pub const HEADER_CAPTURE_DATES: &str = "X-VE-TILEMETA-CaptureDatesRange";
/// Provider tile information; `no-tile` when there is no imagery.
pub const HEADER_TILE_INFO: &str = "X-VE-Tile-Info";

/// Metadata extracted from one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileMetadata {
    pub capture_date: Option<String>,
    pub tile_info: Option<String>,
    /// Absolute expiry in epoch milliseconds
    pub expires: Option<i64>,
}

impl TileMetadata {
    /// Read metadata from response headers.
    ///
    /// `Expires` wins over `Cache-Control: max-age`, which is resolved
    /// relative to `now_ms`.
    pub fn from_response(response: &TileResponse, now_ms: i64) -> Self {
        let expires = response.expiration().or_else(|| {
            response
                .header("cache-control")
                .and_then(parse_max_age)
                .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000)))
                .filter(|millis| *millis != 0)
        });

        Self {
            capture_date: response.header(HEADER_CAPTURE_DATES).map(str::to_string),
            tile_info: response.header(HEADER_TILE_INFO).map(str::to_string),
            expires,
        }
    }

    /// True when the provider says it has no imagery for this tile.
    pub fn is_no_tile(&self) -> bool {
        self.tile_info.as_deref() == Some(NO_TILE_SENTINEL)
    }

    /// Copy the present values into the tile's metadata bag.
    ///
    /// Absent values leave earlier entries in place.
    pub fn apply_to(&self, tile: &Tile) {
        if let Some(capture_date) = &self.capture_date {
            tile.put_value(META_CAPTURE_DATE, capture_date.as_str());
        }
        if let Some(tile_info) = &self.tile_info {
            tile.put_value(META_TILE_INFO, tile_info.as_str());
        }
        if let Some(expires) = self.expires {
            tile.put_value(META_EXPIRES, expires.to_string());
        }
    }
}

/// Seconds from the last `max-age=` directive of a `Cache-Control` value.
///
/// A malformed number is logged and yields `None`.
pub fn parse_max_age(cache_control: &str) -> Option<i64> {
    let mut max_age = None;
    for directive in cache_control.split(',') {
        let directive = directive.trim();
        let Some((name, value)) = directive.split_once('=') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("max-age") {
            continue;
        }
        match value.trim().trim_matches('"').parse::<i64>() {
            Ok(secs) => max_age = Some(secs),
            Err(e) => {
                warn!(cache_control, error = %e, "Ignoring malformed Cache-Control header");
                return None;
            }
        }
    }
    max_age
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::source::UrlTemplateSource;
    use std::io::empty;
    use std::sync::Arc;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn response(headers: &[(&str, &str)]) -> TileResponse {
        headers
            .iter()
            .fold(TileResponse::new(200, empty()), |response, (name, value)| {
                response.with_header(name, *value)
            })
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age("max-age=3600"), Some(3600));
        assert_eq!(parse_max_age("public, max-age=60, must-revalidate"), Some(60));
        assert_eq!(parse_max_age("Max-Age = 10"), Some(10));
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=abc"), None);
        assert_eq!(parse_max_age(""), None);
    }

    #[test]
    fn test_max_age_sets_expiry_relative_to_now() {
        let metadata =
            TileMetadata::from_response(&response(&[("Cache-Control", "max-age=3600")]), NOW_MS);
        assert_eq!(metadata.expires, Some(NOW_MS + 3_600_000));
    }

    #[test]
    fn test_malformed_max_age_yields_no_expiry() {
        let metadata =
            TileMetadata::from_response(&response(&[("Cache-Control", "max-age=abc")]), NOW_MS);
        assert_eq!(metadata.expires, None);
    }

    #[test]
    fn test_expires_header_wins_over_max_age() {
        let metadata = TileMetadata::from_response(
            &response(&[
                ("Expires", "Wed, 21 Oct 2015 07:28:00 GMT"),
                ("Cache-Control", "max-age=3600"),
            ]),
            NOW_MS,
        );
        assert_eq!(metadata.expires, Some(1_445_412_480_000));
    }

    #[test]
    fn test_unparseable_expires_falls_back_to_max_age() {
        let metadata = TileMetadata::from_response(
            &response(&[("Expires", "0"), ("Cache-Control", "max-age=10")]),
            NOW_MS,
        );
        assert_eq!(metadata.expires, Some(NOW_MS + 10_000));
    }

    #[test]
    fn test_provider_headers_are_verbatim() {
        let metadata = TileMetadata::from_response(
            &response(&[
                ("x-ve-tilemeta-capturedatesrange", "1/1/2019-12/31/2020"),
                ("X-VE-Tile-Info", "no-tile"),
            ]),
            NOW_MS,
        );
        assert_eq!(metadata.capture_date.as_deref(), Some("1/1/2019-12/31/2020"));
        assert!(metadata.is_no_tile());
    }

    #[test]
    fn test_apply_to_tile() {
        let tile = Tile::new(
            Arc::new(UrlTemplateSource::bing_aerial()),
            TileCoord::new(3, 1, 2).unwrap(),
        );
        tile.put_value(META_TILE_INFO, "previous");

        let metadata = TileMetadata {
            capture_date: Some("2020".to_string()),
            tile_info: None,
            expires: Some(42),
        };
        metadata.apply_to(&tile);

        assert_eq!(tile.value(META_CAPTURE_DATE).as_deref(), Some("2020"));
        assert_eq!(tile.value(META_TILE_INFO).as_deref(), Some("previous"));
        assert_eq!(tile.value(META_EXPIRES).as_deref(), Some("42"));
    }
}
