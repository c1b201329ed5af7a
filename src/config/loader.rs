// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Parses durations, regexes and signal names, checks launch names are
///   unique and that `log_marker` probes have a log file to read.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for a run.
///
/// - An explicit `--config` path must exist.
/// - Otherwise `Procset.toml` is used when present.
/// - Otherwise the built-in layout ([`ConfigFile::builtin`]).
pub fn resolve_config(explicit: Option<&str>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        debug!(path, "loading config given on the command line");
        return load_and_validate(path);
    }

    let path = default_config_path();
    if path.is_file() {
        debug!(path = %path.display(), "loading default config file");
        return load_and_validate(&path);
    }

    info!(
        path = %path.display(),
        "no config file found; using the built-in launch layout"
    );
    Ok(ConfigFile::builtin())
}

/// Default config location: `Procset.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Procset.toml")
}
