//! Tile coordinate handling
//!
//! Converts geographic coordinates to slippy-map tile coordinates and parses
//! `zoom/x/y` tile addresses.

mod types;

pub use types::{CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM};

use std::f64::consts::PI;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
///
/// # Returns
///
/// The tile containing the point. Points on the east edge (lon = 180) map to
/// the last column.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = TileCoord::tiles_per_axis(zoom) as f64;
    let last = (TileCoord::tiles_per_axis(zoom) - 1) as u32;

    let col = (((lon + 180.0) / 360.0 * n) as u32).min(last);

    let lat_rad = lat * PI / 180.0;
    let row = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32).min(last);

    Ok(TileCoord { row, col, zoom })
}

/// Parses a `zoom/x/y` tile address such as `12/2200/1343`.
pub fn parse_tile_address(address: &str) -> Result<TileCoord, CoordError> {
    let invalid = || CoordError::InvalidAddress(address.to_string());

    let mut parts = address.trim().split('/');
    let (Some(zoom), Some(col), Some(row), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let zoom: u8 = zoom.parse().map_err(|_| invalid())?;
    let col: u32 = col.parse().map_err(|_| invalid())?;
    let row: u32 = row.parse().map_err(|_| invalid())?;

    TileCoord::new(zoom, col, row)
}
