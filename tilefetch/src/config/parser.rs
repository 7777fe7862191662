//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::clamp_concurrent_connections;
use super::file::{ConfigFile, ConfigFileError};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [loader] section
    if let Some(section) = ini.section(Some("loader")) {
        if let Some(v) = section.get("threads") {
            let threads: usize = parse_number("loader", "threads", v)?;
            config.loader.threads = clamp_concurrent_connections(threads);
        }
        if let Some(v) = section.get("connect_timeout_ms") {
            config.loader.connect_timeout_ms = parse_number("loader", "connect_timeout_ms", v)?;
        }
        if let Some(v) = section.get("read_timeout_ms") {
            config.loader.read_timeout_ms = parse_number("loader", "read_timeout_ms", v)?;
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                config.loader.user_agent = Some(v.to_string());
            }
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("max_age_days") {
            let days: u32 = parse_number("cache", "max_age_days", v)?;
            if days == 0 {
                return Err(ConfigFileError::InvalidValue {
                    section: "cache".to_string(),
                    key: "max_age_days".to_string(),
                    value: v.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.cache.max_age_days = days;
        }
    }

    // [headers] section
    if let Some(section) = ini.section(Some("headers")) {
        for (name, value) in section.iter() {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            config
                .headers
                .push((name.to_string(), value.trim().to_string()));
        }
    }

    Ok(config)
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a non-negative integer".to_string(),
        })
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
