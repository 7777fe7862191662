//! Cache path construction.

use crate::coord::TileCoord;
use std::path::{Path, PathBuf};

/// Construct the full path for a cached tile.
///
/// Uses the slippy-map layout:
/// ```text
/// <cache_dir>/<source>/<zoom>/<x>/<y>.<ext>
/// ```
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use tilefetch::cache::cache_path;
/// use tilefetch::coord::TileCoord;
///
/// let tile = TileCoord { row: 1343, col: 2200, zoom: 12 };
/// let path = cache_path(&PathBuf::from("/cache"), "osm", &tile, "png");
///
/// assert_eq!(path, PathBuf::from("/cache/osm/12/2200/1343.png"));
/// ```
pub fn cache_path(cache_dir: &Path, source: &str, tile: &TileCoord, extension: &str) -> PathBuf {
    column_directory(cache_dir, source, tile).join(format!("{}.{}", tile.row, extension))
}

/// Get the directory holding every cached row of a tile's column.
pub fn column_directory(cache_dir: &Path, source: &str, tile: &TileCoord) -> PathBuf {
    cache_dir
        .join(source)
        .join(tile.zoom.to_string())
        .join(tile.col.to_string())
}

/// Get the directory of a tile source.
pub fn source_directory(cache_dir: &Path, source: &str) -> PathBuf {
    cache_dir.join(source)
}
