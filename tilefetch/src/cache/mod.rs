//! Disk tile cache.
//!
//! One file per tile under `<cache_dir>/<source>/<zoom>/<x>/<y>.<ext>`. The
//! file's modification time is the only freshness signal; there is no index,
//! checksum or ETag. Other processes may pre-seed or purge the directory at
//! any time.
//!
//! # Example
//!
//! ```
//! use tilefetch::cache::DiskCache;
//!
//! let dir = std::env::temp_dir().join("tilefetch-doc-cache");
//! let cache = DiskCache::new(&dir);
//! let path = dir.join("osm").join("0").join("0").join("0.png");
//!
//! assert!(cache.write(&path, b"bytes"));
//! assert_eq!(cache.read(&path, false).as_deref(), Some(&b"bytes"[..]));
//! ```

mod disk;
mod path;
mod types;
mod writer;

pub use disk::{DiskCache, DEFAULT_MAX_CACHE_AGE};
pub use path::{cache_path, column_directory, source_directory};
pub use types::CacheError;
pub use writer::CacheWriter;
