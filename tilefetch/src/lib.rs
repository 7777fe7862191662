//! tilefetch - concurrent map tile loading with a disk cache
//!
//! This library fetches slippy-map tiles over HTTP on a bounded worker pool,
//! keeps one file per tile on local disk, and falls back to stale cached
//! tiles when the network fails.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilefetch::config::ConfigFile;
//! use tilefetch::coord::to_tile_coords;
//! use tilefetch::loader::TileLoader;
//! use tilefetch::source::UrlTemplateSource;
//! use tilefetch::tile::Tile;
//!
//! let config = ConfigFile::load()?.to_loader_config();
//! let loader = TileLoader::new(config, Arc::new(|tile: &Arc<Tile>, ok: bool| {
//!     println!("{} -> {}", tile.key(), ok);
//! }));
//!
//! let coord = to_tile_coords(51.5074, -0.1278, 12)?;
//! let tile = Tile::shared(Arc::new(UrlTemplateSource::openstreetmap()), coord);
//! loader.submit(loader.create_job(tile), false);
//! loader.wait_idle();
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod decode;
pub mod loader;
pub mod logging;
pub mod pool;
pub mod source;
pub mod tile;
pub mod transport;

/// Version of the tilefetch library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
