//! Disk cache accessor: one file per tile, freshness by modification time.

use crate::cache::path::cache_path;
use crate::cache::types::CacheError;
use crate::cache::writer::CacheWriter;
use crate::tile::Tile;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, trace, warn};

/// Age after which a cached tile is no longer served as fresh (28 days).
pub const DEFAULT_MAX_CACHE_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 28);

/// Disk cache for fetched tiles.
///
/// The cache never deletes files. An expired file is simply not returned by
/// a normal read, but stays available as a fallback when the network fails.
#[derive(Debug, Clone)]
pub struct DiskCache {
    /// Cache directory root
    cache_dir: PathBuf,
    /// Freshness limit, compared in whole seconds
    max_age: Duration,
}

impl DiskCache {
    /// Create a cache rooted at `cache_dir` with the default 28 day limit.
    ///
    /// The directory is created lazily on first write.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_age: DEFAULT_MAX_CACHE_AGE,
        }
    }

    /// Set the freshness limit.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Get the cache root.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the freshness limit.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Canonical cache path for a tile, or `None` if its source is not
    /// cacheable.
    pub fn resolve_path(&self, tile: &Tile) -> Option<PathBuf> {
        let source = tile.source();
        if !source.is_cacheable() {
            return None;
        }
        Some(cache_path(
            &self.cache_dir,
            source.id(),
            &tile.coord(),
            source.file_extension(),
        ))
    }

    /// Read a cached tile.
    ///
    /// Returns `None` if the file does not exist, cannot be read, or (unless
    /// `allow_stale` is set) is older than the freshness limit.
    pub fn read(&self, path: &Path, allow_stale: bool) -> Option<Vec<u8>> {
        self.read_at(path, allow_stale, SystemTime::now())
    }

    /// [`read`](Self::read) against an explicit clock.
    pub fn read_at(&self, path: &Path, allow_stale: bool, now: SystemTime) -> Option<Vec<u8>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return None,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Cannot stat cached tile");
                }
                return None;
            }
        };

        if !allow_stale {
            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cached tile has no modification time");
                    return None;
                }
            };
            let age = age_between(modified, now);
            if self.is_expired(age) {
                debug!(
                    path = %path.display(),
                    age_secs = age.as_secs(),
                    max_age_secs = self.max_age.as_secs(),
                    "Cached tile is stale"
                );
                return None;
            }
        }

        match fs::read(path) {
            Ok(bytes) => {
                trace!(path = %path.display(), bytes = bytes.len(), allow_stale, "Cache hit");
                Some(bytes)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cached tile");
                None
            }
        }
    }

    /// Age of a cached file, or `None` if it does not exist.
    pub fn file_age(&self, path: &Path) -> Option<Duration> {
        self.file_age_at(path, SystemTime::now())
    }

    /// [`file_age`](Self::file_age) against an explicit clock.
    pub fn file_age_at(&self, path: &Path, now: SystemTime) -> Option<Duration> {
        let modified = fs::metadata(path).ok()?.modified().ok()?;
        Some(age_between(modified, now))
    }

    /// Whether a file of the given age is past the freshness limit.
    ///
    /// Ages are compared in whole seconds: exactly at the limit is fresh.
    pub fn is_expired(&self, age: Duration) -> bool {
        age.as_secs() > self.max_age.as_secs()
    }

    /// Write a tile to the cache, replacing any existing file atomically.
    ///
    /// Best-effort: failures are logged and reported as `false`.
    pub fn write(&self, path: &Path, bytes: &[u8]) -> bool {
        let result = self.open_writer(path).and_then(|mut writer| {
            writer.write_all(bytes)?;
            writer.commit()
        });
        match result {
            Ok(_) => {
                trace!(path = %path.display(), bytes = bytes.len(), "Tile cached");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not cache tile");
                false
            }
        }
    }

    /// Open a streaming writer for `path`.
    pub fn open_writer(&self, path: &Path) -> Result<CacheWriter, CacheError> {
        CacheWriter::create(path)
    }
}

/// Time since `modified`; files stamped in the future count as brand new.
fn age_between(modified: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(modified).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::source::UrlTemplateSource;
    use std::sync::Arc;
    use std::time::UNIX_EPOCH;
    use tempfile::TempDir;

    fn fixed_now() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    fn cached_file(temp: &TempDir, age: Duration) -> PathBuf {
        let path = temp.path().join("osm").join("1").join("0").join("0.png");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"tile-bytes").unwrap();
        set_mtime(&path, fixed_now() - age);
        path
    }

    #[test]
    fn test_resolve_path() {
        let cache = DiskCache::new("/cache");
        let tile = Tile::new(
            Arc::new(UrlTemplateSource::openstreetmap()),
            TileCoord::new(12, 2200, 1343).unwrap(),
        );
        assert_eq!(
            cache.resolve_path(&tile),
            Some(PathBuf::from("/cache/osm/12/2200/1343.png"))
        );
    }

    #[test]
    fn test_resolve_path_uncacheable_source() {
        let cache = DiskCache::new("/cache");
        let tile = Tile::new(
            Arc::new(UrlTemplateSource::openstreetmap().with_caching(false)),
            TileCoord::new(1, 0, 0).unwrap(),
        );
        assert_eq!(cache.resolve_path(&tile), None);
    }

    #[test]
    fn test_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());
        assert_eq!(cache.read(&temp.path().join("nope.png"), false), None);
        assert_eq!(cache.read(&temp.path().join("nope.png"), true), None);
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());
        let path = temp.path().join("osm").join("3").join("1").join("2.png");

        assert!(cache.write(&path, b"png-data"));
        assert_eq!(cache.read(&path, false).as_deref(), Some(&b"png-data"[..]));
    }

    #[test]
    fn test_age_exactly_at_limit_is_fresh() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());
        let path = cached_file(&temp, DEFAULT_MAX_CACHE_AGE);

        assert_eq!(
            cache.read_at(&path, false, fixed_now()).as_deref(),
            Some(&b"tile-bytes"[..])
        );
    }

    #[test]
    fn test_one_second_past_limit_is_stale() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());
        let path = cached_file(&temp, DEFAULT_MAX_CACHE_AGE + Duration::from_secs(1));

        assert_eq!(cache.read_at(&path, false, fixed_now()), None);
        assert!(path.exists(), "stale files are never deleted");
    }

    #[test]
    fn test_allow_stale_skips_age_check() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());
        let path = cached_file(&temp, Duration::from_secs(365 * 24 * 60 * 60));

        assert_eq!(
            cache.read_at(&path, true, fixed_now()).as_deref(),
            Some(&b"tile-bytes"[..])
        );
    }

    #[test]
    fn test_custom_max_age() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path()).with_max_age(Duration::from_secs(60));
        let path = cached_file(&temp, Duration::from_secs(61));

        assert_eq!(cache.read_at(&path, false, fixed_now()), None);
        assert!(cache.read_at(&path, true, fixed_now()).is_some());
    }

    #[test]
    fn test_future_mtime_is_fresh() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());
        let path = cached_file(&temp, Duration::ZERO);
        set_mtime(&path, fixed_now() + Duration::from_secs(3600));

        assert!(cache.read_at(&path, false, fixed_now()).is_some());
        assert_eq!(cache.file_age_at(&path, fixed_now()), Some(Duration::ZERO));
    }

    #[test]
    fn test_file_age() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());
        let path = cached_file(&temp, Duration::from_secs(90));

        assert_eq!(
            cache.file_age_at(&path, fixed_now()),
            Some(Duration::from_secs(90))
        );
        assert_eq!(cache.file_age(&temp.path().join("missing")), None);
    }

    #[test]
    fn test_is_expired_uses_whole_seconds() {
        let cache = DiskCache::new("/cache").with_max_age(Duration::from_secs(10));
        assert!(!cache.is_expired(Duration::from_millis(10_999)));
        assert!(cache.is_expired(Duration::from_secs(11)));
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("osm");
        fs::write(&blocker, b"not a directory").unwrap();

        let cache = DiskCache::new(temp.path());
        assert!(!cache.write(&blocker.join("1").join("0").join("0.png"), b"data"));
    }

    #[test]
    fn test_directory_is_not_a_cache_hit() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());
        assert_eq!(cache.read(temp.path(), true), None);
    }
}
