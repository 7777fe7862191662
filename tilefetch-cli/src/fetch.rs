//! The fetch command: load a list of tiles and report each outcome.

use crate::error::CliError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tilefetch::config::{ConfigFile, LoaderConfig};
use tilefetch::coord::{parse_tile_address, to_tile_coords, TileCoord};
use tilefetch::loader::{TileLoader, TileLoaderListener};
use tilefetch::source::{TileSource, UrlTemplateSource};
use tilefetch::tile::{Tile, META_CAPTURE_DATE, META_EXPIRES, META_TILE_INFO};
use tracing::{info, warn};

/// Options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// `osm`, `bing` or a URL template
    pub source: String,
    /// Cache directory name for template sources
    pub source_id: String,
    /// `z/x/y` addresses
    pub tiles: Vec<String>,
    /// Geographic position, converted with `zoom`
    pub position: Option<(f64, f64)>,
    pub zoom: u8,
    pub force: bool,
    pub config_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub threads: Option<usize>,
    /// `Name: Value` pairs
    pub headers: Vec<String>,
    pub connect_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
}

/// Outcome of one tile, as printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileReport {
    pub coord: TileCoord,
    pub success: bool,
    pub detail: String,
}

/// Resolve `--source` into a tile source.
pub fn build_source(source: &str, source_id: &str) -> Result<Arc<dyn TileSource>, CliError> {
    match source.to_ascii_lowercase().as_str() {
        "osm" | "openstreetmap" => Ok(Arc::new(UrlTemplateSource::openstreetmap())),
        "bing" => Ok(Arc::new(UrlTemplateSource::bing_aerial())),
        _ if source.contains("{z}") || source.contains("{quadkey}") => {
            Ok(Arc::new(UrlTemplateSource::new(source_id, source)))
        }
        _ => Err(CliError::InvalidArgument(format!(
            "unknown source '{}': use osm, bing or a URL template with {{z}}/{{x}}/{{y}}",
            source
        ))),
    }
}

/// Split a `Name: Value` header argument.
pub fn parse_header(header: &str) -> Result<(String, String), CliError> {
    match header.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(CliError::InvalidArgument(format!(
            "header '{}' must look like Name: Value",
            header
        ))),
    }
}

/// Every requested tile, in order, without duplicates.
pub fn collect_coords(options: &FetchOptions) -> Result<Vec<TileCoord>, CliError> {
    let mut coords = Vec::new();
    for address in &options.tiles {
        coords.push(parse_tile_address(address)?);
    }
    if let Some((lat, lon)) = options.position {
        coords.push(to_tile_coords(lat, lon, options.zoom)?);
    }

    let mut seen = HashSet::new();
    coords.retain(|coord| seen.insert(*coord));

    if coords.is_empty() {
        return Err(CliError::NoTiles);
    }
    Ok(coords)
}

/// Load the config file and apply command-line overrides.
pub fn build_config(options: &FetchOptions) -> Result<LoaderConfig, CliError> {
    let file = match &options.config_path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    let mut config = file.to_loader_config();

    if let Some(threads) = options.threads {
        config.set_concurrent_connections(threads);
    }
    if let Some(cache_dir) = &options.cache_dir {
        config = config.with_cache_dir(cache_dir.clone());
    }
    if let Some(ms) = options.connect_timeout_ms {
        config.set_connect_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = options.read_timeout_ms {
        config.set_read_timeout(Duration::from_millis(ms));
    }
    for header in &options.headers {
        let (name, value) = parse_header(header)?;
        config.set_header(name, value);
    }
    Ok(config)
}

/// Fetch all requested tiles and wait for every callback.
pub fn run(options: &FetchOptions) -> Result<Vec<TileReport>, CliError> {
    let source = build_source(&options.source, &options.source_id)?;
    let coords = collect_coords(options)?;
    for coord in &coords {
        if !source.supports_zoom(coord.zoom) {
            return Err(CliError::InvalidArgument(format!(
                "zoom {} is outside {}..={} for source '{}'",
                coord.zoom,
                source.min_zoom(),
                source.max_zoom(),
                source.id()
            )));
        }
    }
    let config = build_config(options)?;

    let (tx, rx) = mpsc::channel();
    let loader = TileLoader::new(config, channel_listener(tx));
    info!(tiles = coords.len(), source = source.id(), force = options.force, "Fetching tiles");

    let result = fetch_tiles(&loader, &rx, &source, &coords, options.force);
    loader.shutdown();
    info!(stats = %loader.stats(), "Fetch finished");
    result
}

type Finished = (Arc<Tile>, bool);

/// Listener forwarding every finished tile into `tx`.
fn channel_listener(tx: mpsc::Sender<Finished>) -> Arc<dyn TileLoaderListener> {
    let tx = Mutex::new(tx);
    Arc::new(move |tile: &Arc<Tile>, success: bool| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send((Arc::clone(tile), success));
        }
    })
}

/// Submit one job per coordinate, wait for the loader to go idle and collect
/// the callbacks that arrived on `finished`.
fn fetch_tiles(
    loader: &TileLoader,
    finished: &mpsc::Receiver<Finished>,
    source: &Arc<dyn TileSource>,
    coords: &[TileCoord],
    force: bool,
) -> Result<Vec<TileReport>, CliError> {
    for coord in coords {
        let tile = Tile::shared(Arc::clone(source), *coord);
        if !loader.submit(loader.create_job(tile), force) {
            warn!(tile = %coord, "Loader rejected tile job");
        }
    }
    loader.wait_idle();

    let mut reports: Vec<TileReport> = finished
        .try_iter()
        .map(|(tile, success)| report(loader, &tile, success))
        .collect();

    if reports.len() < coords.len() {
        return Err(CliError::LoaderStopped {
            reported: reports.len(),
            expected: coords.len(),
        });
    }
    reports.sort_by_key(|report| report.coord);
    Ok(reports)
}

fn report(loader: &TileLoader, tile: &Arc<Tile>, success: bool) -> TileReport {
    let mut parts = Vec::new();
    if success {
        if let Some(image) = tile.image() {
            parts.push(format!("{}x{}", image.width(), image.height()));
        }
        if let Some(path) = loader.cache().resolve_path(tile) {
            parts.push(path.display().to_string());
        }
    } else if let Some(message) = tile.error_message() {
        parts.push(message);
    }
    for key in [META_CAPTURE_DATE, META_TILE_INFO, META_EXPIRES] {
        if let Some(value) = tile.value(key) {
            parts.push(format!("{}={}", key, value));
        }
    }

    TileReport {
        coord: tile.coord(),
        success,
        detail: parts.join("  "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn options() -> FetchOptions {
        FetchOptions {
            source: "osm".to_string(),
            source_id: "custom".to_string(),
            zoom: 12,
            ..FetchOptions::default()
        }
    }

    #[test]
    fn test_build_named_sources() {
        assert_eq!(build_source("osm", "x").unwrap().id(), "osm");
        assert_eq!(build_source("BING", "x").unwrap().id(), "bing");
    }

    #[test]
    fn test_build_template_source() {
        let source = build_source("https://maps.example/{z}/{x}/{y}.png", "example").unwrap();
        assert_eq!(source.id(), "example");
        let coord = TileCoord::new(2, 1, 3).unwrap();
        assert_eq!(source.tile_url(&coord), "https://maps.example/2/1/3.png");
    }

    #[test]
    fn test_unknown_source_rejected() {
        assert!(matches!(
            build_source("mapquest", "x"),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Referer: https://example.org/").unwrap(),
            ("Referer".to_string(), "https://example.org/".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_collect_coords_dedups_and_keeps_order() {
        let mut options = options();
        options.tiles = vec!["3/1/2".to_string(), "1/0/0".to_string(), "3/1/2".to_string()];

        let coords = collect_coords(&options).unwrap();
        assert_eq!(
            coords,
            vec![TileCoord::new(3, 1, 2).unwrap(), TileCoord::new(1, 0, 0).unwrap()]
        );
    }

    #[test]
    fn test_collect_coords_from_position() {
        let mut options = options();
        options.position = Some((51.5074, -0.1278));
        options.zoom = 10;

        let coords = collect_coords(&options).unwrap();
        assert_eq!(coords, vec![TileCoord::new(10, 511, 340).unwrap()]);
    }

    #[test]
    fn test_collect_coords_requires_a_tile() {
        assert!(matches!(collect_coords(&options()), Err(CliError::NoTiles)));
    }

    #[test]
    fn test_collect_coords_rejects_bad_address() {
        let mut options = options();
        options.tiles = vec!["3/9/9".to_string()];
        assert!(matches!(collect_coords(&options), Err(CliError::Coord(_))));
    }

    #[test]
    fn test_build_config_applies_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(
            &config_path,
            "[loader]\nthreads = 2\nread_timeout_ms = 100\n\n[headers]\nX-From-File = yes\n",
        )
        .unwrap();

        let mut options = options();
        options.config_path = Some(config_path);
        options.threads = Some(5);
        options.cache_dir = Some(temp_dir.path().join("tiles"));
        options.connect_timeout_ms = Some(900);
        options.headers = vec!["X-From-Cli: 1".to_string()];

        let config = build_config(&options).unwrap();
        assert_eq!(config.concurrent_connections(), 5);
        assert_eq!(config.read_timeout(), Duration::from_millis(100));
        assert_eq!(config.connect_timeout(), Duration::from_millis(900));
        assert_eq!(config.cache_dir(), temp_dir.path().join("tiles"));
        assert_eq!(config.header("x-from-file"), Some("yes"));
        assert_eq!(config.header("X-From-Cli"), Some("1"));
    }

    #[test]
    fn test_run_rejects_unsupported_zoom() {
        let mut options = options();
        options.source = "bing".to_string();
        options.tiles = vec!["0/0/0".to_string()];

        assert!(matches!(run(&options), Err(CliError::InvalidArgument(_))));
    }

    fn loader_in(dir: &TempDir) -> (TileLoader, mpsc::Receiver<Finished>) {
        let (tx, rx) = mpsc::channel();
        let config = LoaderConfig::new().with_cache_dir(dir.path());
        (TileLoader::new(config, channel_listener(tx)), rx)
    }

    #[test]
    fn test_fetch_tiles_reports_cached_tiles() {
        let temp_dir = TempDir::new().unwrap();
        let (loader, rx) = loader_in(&temp_dir);
        let source = build_source("osm", "x").unwrap();
        let coords = vec![TileCoord::new(2, 3, 1).unwrap(), TileCoord::new(1, 0, 1).unwrap()];

        let mut png = Cursor::new(Vec::new());
        RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        for coord in &coords {
            let tile = Tile::shared(Arc::clone(&source), *coord);
            let path = loader.cache().resolve_path(&tile).unwrap();
            assert!(loader.cache().write(&path, png.get_ref()));
        }

        let reports = fetch_tiles(&loader, &rx, &source, &coords, false).unwrap();
        loader.shutdown();

        let mut expected = coords.clone();
        expected.sort();
        let reported: Vec<TileCoord> = reports.iter().map(|report| report.coord).collect();
        assert_eq!(reported, expected);
        assert!(reports
            .iter()
            .all(|report| report.success && report.detail.starts_with("2x2")));
    }

    #[test]
    fn test_fetch_tiles_reports_missing_callbacks() {
        let temp_dir = TempDir::new().unwrap();
        let (loader, rx) = loader_in(&temp_dir);
        let source = build_source("osm", "x").unwrap();
        loader.shutdown();

        let result = fetch_tiles(&loader, &rx, &source, &[TileCoord::new(1, 1, 1).unwrap()], false);

        assert!(matches!(
            result,
            Err(CliError::LoaderStopped {
                reported: 0,
                expected: 1
            })
        ));
    }
}
