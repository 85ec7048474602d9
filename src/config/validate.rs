// src/config/validate.rs

use crate::config::model::{RawSettings, Settings};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawSettings> for Settings {
    type Error = crate::errors::PipelineError;

    /// Validate and resolve default paths against the user's home directory.
    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        let home = dirs::home_dir().ok_or_else(|| {
            PipelineError::ConfigError("could not determine the home directory".to_string())
        })?;
        Settings::resolve(raw, &home)
    }
}

pub(crate) fn validate_raw_settings(cfg: &RawSettings) -> Result<()> {
    validate_container(cfg)?;
    validate_process(cfg)?;
    validate_reaper(cfg)?;
    validate_reconstruction(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> PipelineError {
    PipelineError::ConfigError(msg.into())
}

fn validate_container(cfg: &RawSettings) -> Result<()> {
    if cfg.container.runtime.trim().is_empty() {
        return Err(config_error("[container].runtime must not be empty"));
    }
    if cfg.container.image.trim().is_empty() {
        return Err(config_error("[container].image must not be empty"));
    }
    if cfg.container.socket_variable.trim().is_empty() {
        return Err(config_error("[container].socket_variable must not be empty"));
    }
    Ok(())
}

fn validate_process(cfg: &RawSettings) -> Result<()> {
    if cfg.process.timeout_secs == 0 {
        return Err(config_error("[process].timeout_secs must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_reaper(cfg: &RawSettings) -> Result<()> {
    let reaper = &cfg.reaper;
    if reaper.backoff_ms == 0 {
        return Err(config_error("[reaper].backoff_ms must be >= 1 (got 0)"));
    }
    if reaper.max_attempts == 0 {
        return Err(config_error("[reaper].max_attempts must be >= 1 (got 0)"));
    }
    if reaper.interpreter.trim().is_empty() {
        return Err(config_error("[reaper].interpreter must not be empty"));
    }
    if reaper.markers.iter().all(|m| m.trim().is_empty()) {
        return Err(config_error("[reaper].markers must name at least one tool"));
    }
    Ok(())
}

fn validate_reconstruction(cfg: &RawSettings) -> Result<()> {
    let params = &cfg.reconstruction;
    for (name, value) in [
        ("threshold_first", params.threshold_first),
        ("threshold", params.threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(config_error(format!(
                "[reconstruction].{name} must be within [0, 1] (got {value})"
            )));
        }
    }
    if params.alpha <= 0.0 {
        return Err(config_error(format!(
            "[reconstruction].alpha must be > 0 (got {})",
            params.alpha
        )));
    }
    if params.isotropic_resolution <= 0.0 {
        return Err(config_error(format!(
            "[reconstruction].isotropic_resolution must be > 0 (got {})",
            params.isotropic_resolution
        )));
    }
    Ok(())
}
