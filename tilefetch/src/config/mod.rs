//! Loader configuration.
//!
//! [`LoaderConfig`] is the in-memory builder handed to the loader.
//! [`ConfigFile`] reads the optional `~/.tilefetch/config.ini` and converts
//! it into a `LoaderConfig`.

mod defaults;
mod file;
mod loader;
mod parser;

pub use defaults::{
    clamp_concurrent_connections, default_cache_dir, DEFAULT_ACCEPT,
    DEFAULT_CONCURRENT_CONNECTIONS, DEFAULT_MAX_CACHE_AGE_DAYS, DEFAULT_USER_AGENT,
    MAX_CONCURRENT_CONNECTIONS, MIN_CONCURRENT_CONNECTIONS,
};
pub use file::{
    config_directory, config_file_path, CacheSettings, ConfigFile, ConfigFileError,
    LoaderSettings,
};
pub use loader::LoaderConfig;
