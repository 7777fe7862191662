//! The fetch job for a single tile.
//!
//! A job moves its tile through one attempt:
//!
//! ```text
//! fresh cache file? ── yes ──► decode ──► loaded
//!        │ no (or forced)
//!        ▼
//!   HTTP GET ── metadata ──► "no-tile"? ──► failed (no fallback)
//!        │
//!        ▼
//!  stream body ─┬─► cache writer ─► commit ─► decode from file ──► loaded
//!               └─► memory buffer ────────► decode from memory ─┘
//!        │ any failure
//!        ▼
//!  stale cache file? ── decodes ──► loaded
//!        │ no
//!        ▼
//!      failed
//! ```

use super::error::FetchError;
use super::metadata::TileMetadata;
use super::LoaderContext;
use crate::cache::CacheWriter;
use crate::decode::TileImage;
use crate::tile::Tile;
use std::any::Any;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Body read size.
pub const CHUNK_SIZE: usize = 20 * 1024;

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The tile was already loading, or loaded and the job not forced
    Skipped,
    /// Served from a fresh cache file
    CacheHit,
    /// Fetched from the network; `cached` tells whether the cache file was written
    Downloaded { cached: bool },
    /// The fetch failed and a stale cache file was used instead
    StaleFallback,
    /// The provider has no imagery for this tile
    NoTile,
    /// The attempt failed; the message is also in the tile's status
    Failed(String),
    /// The transport, decoder or listener panicked. A tile still loading at
    /// that point is marked failed.
    Panicked(String),
}

impl JobOutcome {
    /// Whether the listener was told the tile loaded.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            JobOutcome::CacheHit | JobOutcome::Downloaded { .. } | JobOutcome::StaleFallback
        )
    }
}

/// A unit of work loading one tile. Created by
/// [`TileLoader::create_job`](super::TileLoader::create_job).
pub struct TileJob {
    tile: Arc<Tile>,
    context: Arc<LoaderContext>,
    force: bool,
    notified: AtomicBool,
}

struct Downloaded {
    image: TileImage,
    bytes: u64,
    cached: bool,
}

impl TileJob {
    pub(crate) fn new(tile: Arc<Tile>, context: Arc<LoaderContext>) -> Self {
        Self {
            tile,
            context,
            force: false,
            notified: AtomicBool::new(false),
        }
    }

    /// Skip the fresh cache read and ask HTTP caches not to answer.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// The tile this job loads.
    pub fn tile(&self) -> &Arc<Tile> {
        &self.tile
    }

    /// Whether the job is forced.
    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Run the job on the current thread.
    ///
    /// Every outcome except [`JobOutcome::Skipped`] leaves the tile loaded or
    /// failed and calls the listener once, even if a collaborator panics.
    pub fn run(self) -> JobOutcome {
        if !self.tile.begin_loading(self.force) {
            trace!(tile = %self.tile.key(), force = self.force, "Tile busy or loaded, skipping");
            self.context.stats.record_skipped();
            return JobOutcome::Skipped;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.attempt())) {
            Ok(outcome) => outcome,
            Err(payload) => self.abandon(&*payload),
        }
    }

    fn attempt(&self) -> JobOutcome {
        let path = self.context.cache.resolve_path(&self.tile);

        if !self.force {
            if let Some(outcome) = path.as_deref().and_then(|path| self.load_fresh(path)) {
                return outcome;
            }
        }

        match self.download(path.as_deref()) {
            Ok(downloaded) => {
                debug!(
                    tile = %self.tile.key(),
                    bytes = downloaded.bytes,
                    cached = downloaded.cached,
                    "Tile downloaded"
                );
                self.tile.complete(downloaded.image);
                self.context.stats.record_download(downloaded.bytes);
                self.notify(true);
                JobOutcome::Downloaded {
                    cached: downloaded.cached,
                }
            }
            Err(error) => self.recover(path.as_deref(), error),
        }
    }

    fn load_fresh(&self, path: &Path) -> Option<JobOutcome> {
        let bytes = self.context.cache.read(path, false)?;
        match self.context.decoder.decode(&mut bytes.as_slice()) {
            Ok(image) => {
                trace!(tile = %self.tile.key(), "Loaded tile from cache");
                self.tile.complete(image);
                self.context.stats.record_cache_hit();
                self.notify(true);
                Some(JobOutcome::CacheHit)
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cached tile unreadable, fetching");
                None
            }
        }
    }

    fn download(&self, path: Option<&Path>) -> Result<Downloaded, FetchError> {
        let url = self.tile.url();
        let request = self.context.config.read().request_for(url.as_str(), self.force);
        let response = self.context.transport.get(&request)?;

        let metadata = TileMetadata::from_response(&response, chrono::Utc::now().timestamp_millis());
        metadata.apply_to(&self.tile);
        if metadata.is_no_tile() {
            return Err(FetchError::NoTile);
        }
        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status(),
                url,
            });
        }

        let mut body = response.into_body();
        let (buffer, committed) = self.read_body(&mut body, path)?;
        let bytes = buffer.len() as u64;

        let image = match committed.as_deref().map(File::open) {
            Some(Ok(file)) => self.context.decoder.decode(&mut BufReader::new(file))?,
            Some(Err(e)) => {
                debug!(error = %e, "Cannot reopen cached tile, decoding from memory");
                self.context.decoder.decode(&mut buffer.as_slice())?
            }
            None => self.context.decoder.decode(&mut buffer.as_slice())?,
        };

        Ok(Downloaded {
            image,
            bytes,
            cached: committed.is_some(),
        })
    }

    /// Stream the body into memory and, while that works, into the cache.
    ///
    /// Returns the body and the committed cache path, if any.
    fn read_body(
        &self,
        body: &mut dyn Read,
        path: Option<&Path>,
    ) -> Result<(Vec<u8>, Option<PathBuf>), FetchError> {
        let mut writer = path.and_then(|path| match self.context.cache.open_writer(path) {
            Ok(writer) => Some(writer),
            Err(e) => {
                self.cache_write_failed(path, &e);
                None
            }
        });

        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let read = match body.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FetchError::Body(e)),
            };
            buffer.extend_from_slice(&chunk[..read]);

            if let Some(active) = writer.as_mut() {
                if let Err(e) = active.write_all(&chunk[..read]) {
                    self.cache_write_failed(active.target(), &e);
                    writer = None;
                }
            }
        }

        let committed = writer.and_then(|writer| self.commit(writer));
        Ok((buffer, committed))
    }

    fn commit(&self, writer: CacheWriter) -> Option<PathBuf> {
        let target = writer.target().to_path_buf();
        match writer.commit() {
            Ok(path) => Some(path),
            Err(e) => {
                self.cache_write_failed(&target, &e);
                None
            }
        }
    }

    fn cache_write_failed(&self, path: &Path, error: &dyn std::fmt::Display) {
        warn!(path = %path.display(), error = %error, "Could not cache tile");
        self.context.stats.record_cache_write_failure();
    }

    fn recover(&self, path: Option<&Path>, error: FetchError) -> JobOutcome {
        let url = self.tile.url();

        if error.allows_stale_fallback() {
            if let Some(image) = path.and_then(|path| self.load_stale(path)) {
                warn!(url = %url, error = %error, "Fetch failed, using stale cached tile");
                self.tile.complete(image);
                self.context.stats.record_stale_fallback();
                self.notify(true);
                return JobOutcome::StaleFallback;
            }
        }

        let message = error.to_string();
        warn!(url = %url, error = %message, "Failed loading tile");
        self.tile.fail(message.clone());
        self.context.stats.record_failure();
        self.notify(false);

        match error {
            FetchError::NoTile => {
                self.context.stats.record_no_tile();
                JobOutcome::NoTile
            }
            _ => JobOutcome::Failed(message),
        }
    }

    fn load_stale(&self, path: &Path) -> Option<TileImage> {
        let bytes = self.context.cache.read(path, true)?;
        match self.context.decoder.decode(&mut bytes.as_slice()) {
            Ok(image) => Some(image),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Stale cached tile unreadable");
                None
            }
        }
    }

    /// Finish a job whose attempt unwound.
    fn abandon(&self, payload: &(dyn Any + Send)) -> JobOutcome {
        let message = format!("tile job panicked: {}", panic_message(payload));
        error!(url = %self.tile.url(), error = %message, "Failed loading tile");

        if self.tile.is_loading() {
            self.tile.fail(message.clone());
            self.context.stats.record_failure();
        }
        if !self.notified.load(Ordering::Acquire) {
            self.notify(self.tile.is_loaded());
        }
        JobOutcome::Panicked(message)
    }

    fn notify(&self, success: bool) {
        // Set first: a listener that panics has still been called.
        self.notified.store(true, Ordering::Release);
        self.context
            .listener
            .tile_loading_finished(&self.tile, success);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

impl std::fmt::Debug for TileJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileJob")
            .field("tile", &self.tile.key())
            .field("force", &self.force)
            .finish()
    }
}
