#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use niftymic_pipeline::config::{RawSettings, Settings};
use niftymic_pipeline::exec::CommandRunner;
use niftymic_pipeline::fs::FileSystem;
use niftymic_pipeline::job::{JobContext, JobLayout, ReconstructionJob};
use niftymic_pipeline::stages::Toolset;

/// Builder for `Settings` rooted in a test directory instead of `$HOME`.
pub struct SettingsBuilder {
    raw: RawSettings,
    home: PathBuf,
}

impl SettingsBuilder {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            raw: RawSettings::default(),
            home: home.into(),
        }
    }

    pub fn base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.base_directory = Some(dir.into());
        self
    }

    pub fn output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.output_directory = Some(dir.into());
        self
    }

    pub fn dcm2niix(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.dcm2niix_path = Some(path.into());
        self
    }

    pub fn medcon(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.medcon_path = Some(path.into());
        self
    }

    pub fn container_runtime(mut self, runtime: &str) -> Self {
        self.raw.container.runtime = runtime.to_string();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.raw.process.timeout_secs = secs;
        self
    }

    pub fn reaper_backoff_ms(mut self, ms: u64) -> Self {
        self.raw.reaper.backoff_ms = ms;
        self
    }

    pub fn build(self) -> Settings {
        Settings::resolve(self.raw, &self.home).expect("Failed to build valid settings from builder")
    }
}

/// Tools as the fakes expect them: `dcm2niix`, `medcon` and `docker`.
pub fn test_toolset() -> Toolset {
    Toolset {
        dcm2niix: PathBuf::from("/opt/bin/dcm2niix"),
        medcon: PathBuf::from("/opt/bin/medcon"),
        container_runtime: "docker".to_string(),
        image: "renbem/niftymic".to_string(),
    }
}

/// A job rooted at `root` that runs through `runner` against `fs`.
pub fn job_with(
    root: &Path,
    inputs: &[&str],
    runner: Arc<dyn CommandRunner>,
    fs: Arc<dyn FileSystem>,
) -> ReconstructionJob {
    let ctx = JobContext {
        runner,
        fs,
        tools: test_toolset(),
        params: Default::default(),
    };
    ReconstructionJob::new(
        inputs.iter().map(PathBuf::from).collect(),
        JobLayout::new(root),
        ctx,
    )
    .expect("Failed to create job")
}
