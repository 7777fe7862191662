//! Completion callbacks.

use crate::tile::Tile;
use std::sync::Arc;

/// Receives the outcome of every executed fetch job.
///
/// Called exactly once per job that actually ran, on the worker thread that
/// ran it. Jobs skipped because the tile was already loading or loaded do not
/// call back.
pub trait TileLoaderListener: Send + Sync {
    /// `success` is `true` when the tile now holds an image from this attempt
    /// (fresh cache, network or stale cache fallback).
    fn tile_loading_finished(&self, tile: &Arc<Tile>, success: bool);
}

impl<F> TileLoaderListener for F
where
    F: Fn(&Arc<Tile>, bool) + Send + Sync,
{
    fn tile_loading_finished(&self, tile: &Arc<Tile>, success: bool) {
        self(tile, success)
    }
}

/// Listener that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl TileLoaderListener for NoopListener {
    fn tile_loading_finished(&self, _tile: &Arc<Tile>, _success: bool) {}
}
