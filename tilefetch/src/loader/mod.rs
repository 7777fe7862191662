//! Tile loading with a bounded worker pool.
//!
//! The [`TileLoader`] owns a [`JobPool`] and the shared pieces every job needs:
//! configuration, disk cache, transport, decoder and listener. A viewer
//! creates a job per visible tile and submits it; completion arrives on a
//! worker thread through the [`TileLoaderListener`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilefetch::config::LoaderConfig;
//! use tilefetch::coord::TileCoord;
//! use tilefetch::loader::TileLoader;
//! use tilefetch::source::UrlTemplateSource;
//! use tilefetch::tile::Tile;
//!
//! let loader = TileLoader::new(
//!     LoaderConfig::new(),
//!     Arc::new(|tile: &Arc<Tile>, ok: bool| println!("{} loaded: {}", tile.key(), ok)),
//! );
//! let tile = Tile::shared(Arc::new(UrlTemplateSource::openstreetmap()), TileCoord::new(2, 1, 1)?);
//! loader.submit(loader.create_job(tile), false);
//! loader.wait_idle();
//! ```

mod error;
mod job;
mod listener;
mod metadata;
mod stats;

pub use error::FetchError;
pub use job::{JobOutcome, TileJob, CHUNK_SIZE};
pub use listener::{NoopListener, TileLoaderListener};
pub use metadata::{parse_max_age, TileMetadata, HEADER_CAPTURE_DATES, HEADER_TILE_INFO};
pub use stats::{LoaderStats, LoaderStatsSnapshot};

use crate::cache::DiskCache;
use crate::config::LoaderConfig;
use crate::decode::{ImageDecoder, TileDecoder};
use crate::pool::JobPool;
use crate::tile::Tile;
use crate::transport::{ReqwestTransport, Transport};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// State shared by the loader and all of its jobs.
pub(crate) struct LoaderContext {
    /// Read per request, so header and timeout changes apply to later fetches
    pub(crate) config: RwLock<LoaderConfig>,
    pub(crate) cache: DiskCache,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) decoder: Arc<dyn TileDecoder>,
    pub(crate) listener: Arc<dyn TileLoaderListener>,
    pub(crate) stats: LoaderStats,
}

/// Loads tiles on a pool of worker threads.
pub struct TileLoader {
    context: Arc<LoaderContext>,
    pool: JobPool,
}

impl TileLoader {
    /// Create a loader using HTTP via reqwest and the `image` decoder.
    pub fn new(config: LoaderConfig, listener: Arc<dyn TileLoaderListener>) -> Self {
        Self::with_parts(
            config,
            Arc::new(ReqwestTransport::new()),
            Arc::new(ImageDecoder),
            listener,
        )
    }

    /// Create a loader with explicit transport and decoder.
    pub fn with_parts(
        config: LoaderConfig,
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn TileDecoder>,
        listener: Arc<dyn TileLoaderListener>,
    ) -> Self {
        let cache = DiskCache::new(config.cache_dir()).with_max_age(config.max_cache_age());
        let pool = JobPool::new("tile-loader", config.concurrent_connections());

        info!(
            cache_dir = %config.cache_dir().display(),
            threads = config.concurrent_connections(),
            "Tile loader started"
        );

        Self {
            context: Arc::new(LoaderContext {
                config: RwLock::new(config),
                cache,
                transport,
                decoder,
                listener,
                stats: LoaderStats::new(),
            }),
            pool,
        }
    }

    /// Create a job for `tile`. Nothing happens until it is submitted.
    pub fn create_job(&self, tile: Arc<Tile>) -> TileJob {
        TileJob::new(tile, Arc::clone(&self.context))
    }

    /// Queue a job; returns immediately.
    ///
    /// A forced job refetches a loaded tile, skips the fresh cache read and
    /// asks HTTP caches not to answer. Returns `false` after shutdown.
    pub fn submit(&self, job: TileJob, force: bool) -> bool {
        let job = job.with_force(force);
        debug!(tile = %job.tile().key(), force, "Submitting tile job");
        self.pool.execute(move || {
            job.run();
        })
    }

    /// Create and submit a job for `tile`.
    pub fn load(&self, tile: Arc<Tile>, force: bool) -> bool {
        self.submit(self.create_job(tile), force)
    }

    /// Drop every queued job that has not started. Running jobs finish.
    ///
    /// Returns the number of jobs dropped.
    pub fn cancel_outstanding(&self) -> usize {
        let dropped = self.pool.clear_queue();
        if dropped > 0 {
            debug!(dropped, "Cancelled outstanding tile jobs");
        }
        dropped
    }

    /// Change how many tiles are fetched at once (clamped to 1-64).
    ///
    /// Queued jobs are kept.
    pub fn set_concurrent_connections(&self, connections: usize) {
        let size = {
            let mut config = self.context.config.write();
            config.set_concurrent_connections(connections);
            config.concurrent_connections()
        };
        self.pool.resize(size);
    }

    /// Current number of concurrent fetches.
    pub fn concurrent_connections(&self) -> usize {
        self.pool.size()
    }

    /// Add or replace a request header for subsequent fetches.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.context.config.write().set_header(name, value);
    }

    /// Remove a request header for subsequent fetches.
    pub fn remove_header(&self, name: &str) -> Option<String> {
        self.context.config.write().remove_header(name)
    }

    /// Set the connect timeout for subsequent fetches. Zero uses the default.
    pub fn set_connect_timeout(&self, timeout: Duration) {
        self.context.config.write().set_connect_timeout(timeout);
    }

    /// Set the read timeout for subsequent fetches. Zero uses the default.
    pub fn set_read_timeout(&self, timeout: Duration) {
        self.context.config.write().set_read_timeout(timeout);
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> LoaderConfig {
        self.context.config.read().clone()
    }

    /// The disk cache used by this loader.
    pub fn cache(&self) -> &DiskCache {
        &self.context.cache
    }

    /// Counters since the loader was created.
    pub fn stats(&self) -> LoaderStatsSnapshot {
        self.context.stats.snapshot()
    }

    /// Jobs queued but not started.
    pub fn pending(&self) -> usize {
        self.pool.queued()
    }

    /// Block until every submitted job has finished.
    pub fn wait_idle(&self) {
        self.pool.wait_idle();
    }

    /// Like [`wait_idle`](Self::wait_idle) with a deadline. Returns `true` if idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        self.pool.wait_idle_timeout(timeout)
    }

    /// Stop accepting jobs, finish the queue and join the workers.
    pub fn shutdown(&self) {
        self.pool.shutdown();
        info!(stats = %self.stats(), "Tile loader stopped");
    }
}

impl fmt::Display for TileLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TileLoader")
    }
}

impl fmt::Debug for TileLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileLoader")
            .field("cache", &self.context.cache)
            .field("pool", &self.pool)
            .finish()
    }
}
