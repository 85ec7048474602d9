// src/job/layout.rs

//! On-disk layout of one reconstruction job.
//!
//! ```text
//! <root>/
//! <root>/masks/
//! <root>/bias_field/
//! <root>/output.dicom/
//! <root>/output.nii.gz
//! ```
//!
//! Resumed jobs and external tooling rely on these exact relative paths.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::fs::FileSystem;

pub const MASKS_DIR: &str = "masks";
pub const BIAS_FIELD_DIR: &str = "bias_field";
pub const OUTPUT_DICOM_DIR: &str = "output.dicom";
pub const OUTPUT_VOLUME: &str = "output.nii.gz";

/// Format of the timestamped working-directory name.
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H-%M-%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    root: PathBuf,
}

impl JobLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at `<output_root>/<timestamp>`.
    pub fn timestamped(output_root: &Path, now: DateTime<Local>) -> Self {
        Self::new(output_root.join(now.format(TIMESTAMP_FORMAT).to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn masks(&self) -> PathBuf {
        self.root.join(MASKS_DIR)
    }

    pub fn bias_field(&self) -> PathBuf {
        self.root.join(BIAS_FIELD_DIR)
    }

    pub fn output_dicom(&self) -> PathBuf {
        self.root.join(OUTPUT_DICOM_DIR)
    }

    pub fn output_volume(&self) -> PathBuf {
        self.root.join(OUTPUT_VOLUME)
    }

    /// The root and its three subdirectories, parents first.
    pub fn directories(&self) -> [PathBuf; 4] {
        [
            self.root.clone(),
            self.masks(),
            self.bias_field(),
            self.output_dicom(),
        ]
    }

    /// Create every directory of the layout; existing ones are kept.
    pub fn create(&self, fs: &dyn FileSystem) -> Result<()> {
        for dir in self.directories() {
            fs.create_dir_all(&dir)?;
        }
        Ok(())
    }
}
