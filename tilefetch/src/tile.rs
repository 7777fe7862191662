//! The tile entity shared between a viewer and the loader.
//!
//! A [`Tile`] is owned by the consumer (usually behind an `Arc`) and mutated by
//! fetch jobs running on pool workers. Status, metadata and image live behind
//! a single mutex so the "is anyone already loading this?" check and the
//! transition to loading happen atomically.

use crate::coord::TileCoord;
use crate::decode::TileImage;
use crate::source::TileSource;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Metadata key for the provider's capture-date range.
pub const META_CAPTURE_DATE: &str = "capture-date";
/// Metadata key for the provider's tile-info value.
pub const META_TILE_INFO: &str = "tile-info";
/// Metadata key for the absolute expiry time in epoch milliseconds.
pub const META_EXPIRES: &str = "expires";
/// `tile-info` value meaning the provider has no imagery for this tile.
pub const NO_TILE_SENTINEL: &str = "no-tile";

/// Stable identity of a tile: its source plus its grid position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Source identifier
    pub source: String,
    /// Grid coordinates
    pub coord: TileCoord,
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.coord)
    }
}

/// Load status of a tile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TileStatus {
    /// Never attempted
    #[default]
    Idle,
    /// A job is fetching this tile right now
    Loading,
    /// The image is available
    Loaded,
    /// The last attempt failed with the given message
    Failed(String),
}

impl TileStatus {
    /// True for `Loaded` and `Failed`: an attempt has finished.
    pub fn is_done(&self) -> bool {
        matches!(self, TileStatus::Loaded | TileStatus::Failed(_))
    }
}

#[derive(Debug, Default)]
struct TileState {
    status: TileStatus,
    metadata: HashMap<String, String>,
    image: Option<TileImage>,
}

/// A single map tile.
pub struct Tile {
    source: Arc<dyn TileSource>,
    coord: TileCoord,
    state: Mutex<TileState>,
}

impl Tile {
    /// Create an idle tile.
    pub fn new(source: Arc<dyn TileSource>, coord: TileCoord) -> Self {
        Self {
            source,
            coord,
            state: Mutex::new(TileState::default()),
        }
    }

    /// Create an idle tile wrapped in an `Arc`, ready to hand to a loader.
    pub fn shared(source: Arc<dyn TileSource>, coord: TileCoord) -> Arc<Self> {
        Arc::new(Self::new(source, coord))
    }

    /// Identity of this tile.
    pub fn key(&self) -> TileKey {
        TileKey {
            source: self.source.id().to_string(),
            coord: self.coord,
        }
    }

    /// Grid coordinates.
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// The source this tile is fetched from.
    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }

    /// Download URL.
    pub fn url(&self) -> String {
        self.source.tile_url(&self.coord)
    }

    /// Current status snapshot.
    pub fn status(&self) -> TileStatus {
        self.state.lock().status.clone()
    }

    /// True while a job is fetching this tile.
    pub fn is_loading(&self) -> bool {
        self.state.lock().status == TileStatus::Loading
    }

    /// True when the image was loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.state.lock().status == TileStatus::Loaded
    }

    /// True when the last attempt failed.
    pub fn has_error(&self) -> bool {
        matches!(self.state.lock().status, TileStatus::Failed(_))
    }

    /// True once an attempt has finished, successfully or not.
    pub fn is_done(&self) -> bool {
        self.state.lock().status.is_done()
    }

    /// Message of the last failure, if the tile is in the failed state.
    pub fn error_message(&self) -> Option<String> {
        match &self.state.lock().status {
            TileStatus::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Look up a metadata value.
    pub fn value(&self, key: &str) -> Option<String> {
        self.state.lock().metadata.get(key).cloned()
    }

    /// Store a metadata value, replacing any previous one.
    pub fn put_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state.lock().metadata.insert(key.into(), value.into());
    }

    /// Copy of the whole metadata bag.
    pub fn metadata(&self) -> HashMap<String, String> {
        self.state.lock().metadata.clone()
    }

    /// The decoded image, if one has been loaded.
    pub fn image(&self) -> Option<TileImage> {
        self.state.lock().image.clone()
    }

    /// Move to `Loading` unless another job owns the tile.
    ///
    /// Returns `false` (leaving the tile untouched) if the tile is already
    /// loading, or already loaded and `force` is not set.
    pub(crate) fn begin_loading(&self, force: bool) -> bool {
        let mut state = self.state.lock();
        match state.status {
            TileStatus::Loading => false,
            TileStatus::Loaded if !force => false,
            _ => {
                state.status = TileStatus::Loading;
                true
            }
        }
    }

    /// Store the image and mark the tile loaded.
    pub(crate) fn complete(&self, image: TileImage) {
        let mut state = self.state.lock();
        state.image = Some(image);
        state.status = TileStatus::Loaded;
    }

    /// Mark the tile failed. A previously loaded image is kept.
    pub(crate) fn fail(&self, message: impl Into<String>) {
        self.state.lock().status = TileStatus::Failed(message.into());
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("source", &self.source.id())
            .field("coord", &self.coord)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::UrlTemplateSource;
    use image::DynamicImage;

    fn tile() -> Tile {
        Tile::new(
            Arc::new(UrlTemplateSource::openstreetmap()),
            TileCoord::new(3, 4, 5).unwrap(),
        )
    }

    fn image() -> TileImage {
        TileImage::new(DynamicImage::new_rgba8(1, 1))
    }

    #[test]
    fn test_new_tile_is_idle() {
        let tile = tile();
        assert_eq!(tile.status(), TileStatus::Idle);
        assert!(!tile.is_loading());
        assert!(!tile.is_loaded());
        assert!(!tile.has_error());
        assert!(!tile.is_done());
        assert!(tile.image().is_none());
    }

    #[test]
    fn test_key_and_url() {
        let tile = tile();
        assert_eq!(tile.key().to_string(), "osm:3/4/5");
        assert_eq!(tile.url(), "https://tile.openstreetmap.org/3/4/5.png");
    }

    #[test]
    fn test_begin_loading_rejects_second_caller() {
        let tile = tile();
        assert!(tile.begin_loading(false));
        assert!(tile.is_loading());
        assert!(!tile.begin_loading(false));
        assert!(!tile.begin_loading(true), "force never preempts a running job");
    }

    #[test]
    fn test_loaded_tile_only_restarts_when_forced() {
        let tile = tile();
        assert!(tile.begin_loading(false));
        tile.complete(image());

        assert!(!tile.begin_loading(false));
        assert_eq!(tile.status(), TileStatus::Loaded);
        assert!(tile.begin_loading(true));
    }

    #[test]
    fn test_failed_tile_can_restart() {
        let tile = tile();
        assert!(tile.begin_loading(false));
        tile.fail("boom");

        assert!(tile.has_error());
        assert!(tile.is_done());
        assert!(!tile.is_loaded());
        assert_eq!(tile.error_message().as_deref(), Some("boom"));

        assert!(tile.begin_loading(false));
        assert_eq!(tile.error_message(), None);
    }

    #[test]
    fn test_metadata_bag() {
        let tile = tile();
        tile.put_value(META_TILE_INFO, "ok");
        tile.put_value(META_TILE_INFO, NO_TILE_SENTINEL);
        assert_eq!(tile.value(META_TILE_INFO).as_deref(), Some("no-tile"));
        assert_eq!(tile.value(META_EXPIRES), None);
        assert_eq!(tile.metadata().len(), 1);
    }

    #[test]
    fn test_fail_keeps_previous_image() {
        let tile = tile();
        tile.begin_loading(false);
        tile.complete(image());
        tile.begin_loading(true);
        tile.fail("network down");
        assert!(tile.image().is_some());
    }
}
