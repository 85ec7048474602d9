// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::stages::reconstruct::ReconstructionParams;

/// Top-level settings as read from a TOML file.
///
/// Every key is optional; paths that are not given are derived from
/// `base_directory`:
///
/// ```toml
/// base_directory = "/data/NiftyMIC_GUI"
/// dcm2niix_path = "/opt/bin/dcm2niix"
///
/// [container]
/// image = "renbem/niftymic"
///
/// [reconstruction]
/// isotropic_resolution = 0.8
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub debug: Option<bool>,

    /// Root for everything the tool writes (`$HOME/NiftyMIC_GUI` by default).
    #[serde(default)]
    pub base_directory: Option<PathBuf>,

    /// Root under which timestamped working directories are created.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,

    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Directory holding the native converters.
    #[serde(default)]
    pub binary_directory: Option<PathBuf>,

    #[serde(default)]
    pub dcm2niix_path: Option<PathBuf>,

    #[serde(default)]
    pub medcon_path: Option<PathBuf>,

    #[serde(default)]
    pub container: ContainerSection,

    #[serde(default)]
    pub process: ProcessSection,

    #[serde(default)]
    pub reaper: ReaperSection,

    #[serde(default)]
    pub reconstruction: ReconstructionParams,
}

/// `[container]` section: how the containerised toolset is reached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContainerSection {
    /// Container-runtime client executable.
    pub runtime: String,
    /// Image holding the segmentation, bias-field and reconstruction tools.
    pub image: String,
    /// Environment variable naming the runtime's socket endpoint.
    pub socket_variable: String,
    pub socket: String,
}

impl Default for ContainerSection {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image: "renbem/niftymic".to_string(),
            socket_variable: "DOCKER_HOST".to_string(),
            socket: "unix:///run/user/1000/docker.sock".to_string(),
        }
    }
}

/// `[process]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessSection {
    /// Ceiling for a single external invocation.
    pub timeout_secs: u64,
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self { timeout_secs: 3600 }
    }
}

/// `[reaper]` section: how leftover tool processes are recognised and
/// killed on a hard stop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaperSection {
    /// Interpreter the containerised tools run under.
    pub interpreter: String,
    /// Command-line fragments identifying pipeline tools.
    pub markers: Vec<String>,
    pub backoff_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReaperSection {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            markers: vec![
                "fetal_brain_seg.py".to_string(),
                "/usr/local/bin/niftymic_reconstruct_volume".to_string(),
            ],
            backoff_ms: 500,
            max_attempts: 40,
        }
    }
}

/// Validated settings with every path resolved.
///
/// Only constructed through `TryFrom<RawSettings>` (see `validate.rs`) or
/// [`Settings::resolve`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub debug: bool,
    pub base_directory: PathBuf,
    pub output_directory: PathBuf,
    pub log_file: PathBuf,
    pub dcm2niix_path: PathBuf,
    pub medcon_path: PathBuf,
    pub container: ContainerSection,
    pub process: ProcessSection,
    pub reaper: ReaperSection,
    pub reconstruction: ReconstructionParams,
}

impl Settings {
    pub(crate) fn new_unchecked(raw: RawSettings, home: &Path) -> Self {
        let base_directory = raw
            .base_directory
            .unwrap_or_else(|| home.join("NiftyMIC_GUI"));
        let binary_directory = raw
            .binary_directory
            .unwrap_or_else(|| base_directory.join("bin"));

        Self {
            debug: raw.debug.unwrap_or(true),
            output_directory: raw
                .output_directory
                .unwrap_or_else(|| base_directory.join("output")),
            log_file: raw
                .log_file
                .unwrap_or_else(|| base_directory.join("niftymic_gui.log")),
            dcm2niix_path: raw
                .dcm2niix_path
                .unwrap_or_else(|| binary_directory.join("dcm2niix")),
            medcon_path: raw
                .medcon_path
                .unwrap_or_else(|| binary_directory.join("medcon")),
            base_directory,
            container: raw.container,
            process: raw.process,
            reaper: raw.reaper,
            reconstruction: raw.reconstruction,
        }
    }

    /// Validate `raw` and resolve default paths relative to `home`.
    pub fn resolve(raw: RawSettings, home: &Path) -> crate::errors::Result<Self> {
        super::validate::validate_raw_settings(&raw)?;
        Ok(Self::new_unchecked(raw, home))
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process.timeout_secs)
    }

    pub fn reaper_backoff(&self) -> Duration {
        Duration::from_millis(self.reaper.backoff_ms)
    }
}
