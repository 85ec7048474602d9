// src/errors.rs

//! Crate-wide error types.
//!
//! [`StageError`] is the domain-error family raised by the stage functions
//! and the process runner. The job executor catches exactly this family;
//! everything else in [`PipelineError`] is fatal for the background run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures of a single pipeline stage or of the process it launched.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("Failed to convert DICOM {} with return code {exit_code}", .input.display())]
    Conversion { input: PathBuf, exit_code: i32 },

    #[error("Failed to generate mask (return code {exit_code})")]
    MaskGeneration { exit_code: i32 },

    #[error(
        "Failed to apply bias field correction {} {} (return code {exit_code})",
        .image.display(),
        .mask.display()
    )]
    BiasCorrection {
        image: PathBuf,
        mask: PathBuf,
        exit_code: i32,
    },

    #[error("Failed to reconstruct (return code {exit_code})")]
    Reconstruction { exit_code: i32 },

    #[error("Failed to convert NifTI {} to DICOM (return code {exit_code})", .volume.display())]
    OutputConversion { volume: PathBuf, exit_code: i32 },
}

impl StageError {
    /// Short machine-friendly name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Spawn { .. } | StageError::Wait { .. } => "process",
            StageError::Timeout { .. } => "timeout",
            StageError::Conversion { .. } => "conversion",
            StageError::MaskGeneration { .. } => "mask_generation",
            StageError::BiasCorrection { .. } => "bias_correction",
            StageError::Reconstruction { .. } => "reconstruction",
            StageError::OutputConversion { .. } => "output_conversion",
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
