//! tilefetch CLI - Command-line interface
//!
//! Fetches map tiles through the tilefetch loader, using the same disk cache
//! and fallback rules a viewer would.

mod error;
mod fetch;

use clap::Parser;
use error::CliError;
use fetch::FetchOptions;
use std::path::PathBuf;
use tilefetch::logging::{init_console_logging, init_logging, LoggingGuard};

#[derive(Parser)]
#[command(name = "tilefetch", version = tilefetch::VERSION)]
#[command(about = "Fetch map tiles into the local tile cache", long_about = None)]
struct Args {
    /// Tile source: osm, bing, or a URL template such as https://host/{z}/{x}/{y}.png
    #[arg(long, default_value = "osm")]
    source: String,

    /// Cache directory name for a URL template source
    #[arg(long, default_value = "custom")]
    source_id: String,

    /// Tile address as zoom/x/y (repeatable)
    #[arg(long = "tile", value_name = "Z/X/Y")]
    tiles: Vec<String>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Zoom level used with --lat/--lon
    #[arg(long, default_value = "15")]
    zoom: u8,

    /// Refetch even if cached, bypassing HTTP caches
    #[arg(long)]
    force: bool,

    /// Configuration file (default: ~/.tilefetch/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tile cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Concurrent downloads (1-64)
    #[arg(long)]
    threads: Option<usize>,

    /// Extra request header as "Name: Value" (repeatable)
    #[arg(long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Connect timeout in milliseconds (0 = default)
    #[arg(long)]
    connect_timeout_ms: Option<u64>,

    /// Read timeout in milliseconds (0 = default)
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// Also write logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            source: self.source.clone(),
            source_id: self.source_id.clone(),
            tiles: self.tiles.clone(),
            position: self.lat.zip(self.lon),
            zoom: self.zoom,
            force: self.force,
            config_path: self.config.clone(),
            cache_dir: self.cache_dir.clone(),
            threads: self.threads,
            headers: self.headers.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
            read_timeout_ms: self.read_timeout_ms,
        }
    }

    fn init_logging(&self) -> Result<LoggingGuard, CliError> {
        let level = if self.verbose { "debug" } else { "warn" };
        match &self.log_dir {
            Some(dir) => init_logging(dir, tilefetch::logging::default_log_file(), level),
            None => init_console_logging(level),
        }
        .map_err(CliError::LoggingInit)
    }
}

fn main() {
    let args = Args::parse();

    let _logging = match args.init_logging() {
        Ok(guard) => guard,
        Err(e) => e.exit(),
    };

    let reports = match fetch::run(&args.fetch_options()) {
        Ok(reports) => reports,
        Err(e) => e.exit(),
    };

    let mut failed = 0;
    for report in &reports {
        let status = if report.success { "ok" } else { "FAILED" };
        if !report.success {
            failed += 1;
        }
        println!("{:<16} {:<6} {}", report.coord.to_string(), status, report.detail);
    }

    if failed > 0 {
        CliError::TilesFailed {
            failed,
            total: reports.len(),
        }
        .exit();
    }
}
