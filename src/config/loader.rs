// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawSettings, Settings};
use crate::errors::Result;

/// Environment variable that overrides the default settings path.
pub const CONFIG_ENV: &str = "NIFTYMIC_CONFIG";

/// Load a settings file from a given path and return the raw `RawSettings`.
///
/// This only performs TOML deserialization; it does **not** resolve paths or
/// validate values. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawSettings = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a settings file from path, validate it and resolve default paths.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw = load_from_path(&path)?;
    Settings::try_from(raw)
}

/// Load settings the way the binary does.
///
/// - An explicit path (from `--config`) must exist.
/// - Otherwise `NIFTYMIC_CONFIG` is used if set, else
///   [`default_config_path`]; a missing default file means "all defaults".
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return load_and_validate(PathBuf::from(path));
    }

    match default_config_path() {
        Some(path) if path.is_file() => load_and_validate(path),
        _ => Settings::try_from(RawSettings::default()),
    }
}

/// `<home>/NiftyMIC_GUI/niftymic.toml`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("NiftyMIC_GUI").join("niftymic.toml"))
}
