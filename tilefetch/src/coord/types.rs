//! Coordinate type definitions

use std::fmt;
use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom range addressable by slippy-map and quadkey tile servers
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Tile coordinates in the Web Mercator / Slippy Map grid.
///
/// `col` is the x index (0 at the antimeridian, growing east) and `row` is
/// the y index (0 at the north edge, growing south).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a validated tile coordinate.
    ///
    /// Fails if the zoom level is out of range or if `col`/`row` fall outside
    /// the `2^zoom × 2^zoom` grid.
    pub fn new(zoom: u8, col: u32, row: u32) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let tiles = Self::tiles_per_axis(zoom);
        if u64::from(col) >= tiles || u64::from(row) >= tiles {
            return Err(CoordError::OutOfGrid { zoom, col, row });
        }
        Ok(Self { row, col, zoom })
    }

    /// Number of tiles along one axis at the given zoom level.
    #[inline]
    pub fn tiles_per_axis(zoom: u8) -> u64 {
        1u64 << zoom
    }

    /// Bing-style quadkey for this tile.
    ///
    /// Zoom 0 has an empty quadkey.
    pub fn quadkey(&self) -> String {
        let mut quadkey = String::with_capacity(self.zoom as usize);
        for level in (1..=self.zoom).rev() {
            let mask = 1u32 << (level - 1);
            let mut digit = b'0';
            if self.col & mask != 0 {
                digit += 1;
            }
            if self.row & mask != 0 {
                digit += 2;
            }
            quadkey.push(digit as char);
        }
        quadkey
    }
}

impl fmt::Display for TileCoord {
    /// Formats as `zoom/col/row`, the order used in slippy-map URLs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// Errors produced by coordinate conversion and validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between {MIN_LAT} and {MAX_LAT})")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between {MIN_LON} and {MAX_LON})")]
    InvalidLongitude(f64),

    #[error("Invalid zoom level: {0} (must be between {MIN_ZOOM} and {MAX_ZOOM})")]
    InvalidZoom(u8),

    #[error("Tile {col}/{row} is outside the grid at zoom {zoom}")]
    OutOfGrid { zoom: u8, col: u32, row: u32 },

    #[error("Invalid tile address '{0}' (expected zoom/x/y)")]
    InvalidAddress(String),
}
