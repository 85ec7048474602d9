// src/stages/toolset.rs

//! Where the external tools live and how they are invoked.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::exec::command::{path_str, CommandSpec};

/// Container sub-command generating segmentation masks.
pub const SEGMENT_SUBCOMMAND: &str = "niftymic_segment_fetal_brains";
/// Container sub-command correcting the bias field of one image.
pub const BIAS_FIELD_SUBCOMMAND: &str = "niftymic_correct_bias_field";
/// Container sub-command reconstructing the high-resolution volume.
pub const RECONSTRUCT_SUBCOMMAND: &str = "niftymic_reconstruct_volume";

/// Native converters plus the container runtime and image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolset {
    pub dcm2niix: PathBuf,
    pub medcon: PathBuf,
    pub container_runtime: String,
    pub image: String,
}

impl Toolset {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            dcm2niix: settings.dcm2niix_path.clone(),
            medcon: settings.medcon_path.clone(),
            container_runtime: settings.container.runtime.clone(),
            image: settings.container.image.clone(),
        }
    }

    /// Start an invocation of a native executable.
    pub fn native(&self, program: &Path) -> CommandSpec {
        CommandSpec::new(path_str(program))
    }

    /// Start a containerised invocation of `subcommand` with `mount` bound
    /// at the same path inside the container.
    pub fn container(&self, mount: &Path, subcommand: &str) -> CommandSpec {
        let mount = path_str(mount);
        CommandSpec::new(self.container_runtime.clone())
            .args(["run", "--rm", "-t", "-v"])
            .arg(format!("{mount}:{mount}"))
            .arg(self.image.clone())
            .arg(subcommand)
    }
}
