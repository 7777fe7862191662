//! Tile source abstraction.
//!
//! A tile source turns a [`TileCoord`] into a download URL and names the
//! directory its tiles are cached under. URL templates understand these
//! placeholders:
//!
//! | Placeholder | Value                                        |
//! |-------------|----------------------------------------------|
//! | `{z}`       | zoom level                                   |
//! | `{x}`       | column                                       |
//! | `{y}`       | row                                          |
//! | `{quadkey}` | Bing quadkey                                 |
//! | `{s}`       | subdomain, picked from the tile position     |

use crate::coord::TileCoord;
use std::fmt;

/// Describes where the tiles of one imagery layer come from.
pub trait TileSource: Send + Sync + fmt::Debug {
    /// Stable identifier, used as the top-level cache directory.
    fn id(&self) -> &str;

    /// Full download URL for a tile.
    fn tile_url(&self, coord: &TileCoord) -> String;

    /// File extension for cached tiles (without the dot).
    fn file_extension(&self) -> &str {
        "png"
    }

    /// Returns the minimum supported zoom level.
    fn min_zoom(&self) -> u8 {
        0
    }

    /// Returns the maximum supported zoom level.
    fn max_zoom(&self) -> u8 {
        19
    }

    /// Whether tiles from this source may be stored in the disk cache.
    fn is_cacheable(&self) -> bool {
        true
    }

    /// Checks if this source serves the given zoom level.
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom() && zoom <= self.max_zoom()
    }
}

/// Tile source driven by a URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplateSource {
    id: String,
    template: String,
    extension: String,
    subdomains: Vec<String>,
    min_zoom: u8,
    max_zoom: u8,
    cacheable: bool,
}

impl UrlTemplateSource {
    /// Creates a cacheable source serving PNG tiles for zoom 0-19.
    pub fn new(id: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            template: template.into(),
            extension: "png".to_string(),
            subdomains: Vec::new(),
            min_zoom: 0,
            max_zoom: 19,
            cacheable: true,
        }
    }

    /// Standard OpenStreetMap raster tiles.
    pub fn openstreetmap() -> Self {
        Self::new("osm", "https://tile.openstreetmap.org/{z}/{x}/{y}.png")
    }

    /// Bing aerial imagery, addressed by quadkey.
    ///
    /// Responses carry the `X-VE-Tile-Info` and capture-date headers.
    pub fn bing_aerial() -> Self {
        Self::new(
            "bing",
            "https://ecn.t{s}.tiles.virtualearth.net/tiles/a{quadkey}.jpeg?g=1",
        )
        .with_extension("jpeg")
        .with_subdomains(["0", "1", "2", "3"])
        .with_zoom_range(1, 19)
    }

    /// Set the cached file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the subdomains substituted for `{s}`.
    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    /// Set the supported zoom range.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Enable or disable disk caching for this source.
    pub fn with_caching(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    /// Get the URL template.
    pub fn template(&self) -> &str {
        &self.template
    }

    fn subdomain(&self, coord: &TileCoord) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }
        let index = (u64::from(coord.col) + u64::from(coord.row)) % self.subdomains.len() as u64;
        &self.subdomains[index as usize]
    }
}

impl TileSource for UrlTemplateSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn tile_url(&self, coord: &TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &coord.zoom.to_string())
            .replace("{x}", &coord.col.to_string())
            .replace("{y}", &coord.row.to_string())
            .replace("{s}", self.subdomain(coord));
        if url.contains("{quadkey}") {
            url = url.replace("{quadkey}", &coord.quadkey());
        }
        url
    }

    fn file_extension(&self) -> &str {
        &self.extension
    }

    fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}
