// src/job/mod.rs

//! State of one end-to-end reconstruction run.
//!
//! A [`ReconstructionJob`] owns its working directory layout and the artifact
//! lists accumulated across stages. It exposes one method per stage; each
//! method delegates to the matching function in [`crate::stages`] and lets
//! stage errors propagate untouched.

pub mod history;
pub mod layout;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use tracing::info;

use crate::config::Settings;
use crate::errors::Result;
use crate::exec::CommandRunner;
use crate::fs::{find_files, FileSystem, RealFileSystem};
use crate::stages::{self, ReconstructionParams, StageEnv, Toolset};
use crate::types::Stage;

pub use history::{list_runs, remove_run, RunEntry};
pub use layout::JobLayout;

/// Collaborators shared by every stage of a job.
#[derive(Clone)]
pub struct JobContext {
    pub runner: Arc<dyn CommandRunner>,
    pub fs: Arc<dyn FileSystem>,
    pub tools: Toolset,
    pub params: ReconstructionParams,
}

impl JobContext {
    /// Context for the real filesystem with tools and parameters from
    /// `settings`.
    pub fn from_settings(settings: &Settings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            fs: Arc::new(RealFileSystem),
            tools: Toolset::from_settings(settings),
            params: settings.reconstruction.clone(),
        }
    }
}

pub struct ReconstructionJob {
    input_dicoms: Vec<PathBuf>,
    layout: JobLayout,
    intermediate_images: Vec<PathBuf>,
    mask_images: Vec<PathBuf>,
    bias_corrected_images: Vec<PathBuf>,
    ctx: JobContext,
}

impl ReconstructionJob {
    /// Create a job and its working directory tree.
    pub fn new(input_dicoms: Vec<PathBuf>, layout: JobLayout, ctx: JobContext) -> Result<Self> {
        layout
            .create(ctx.fs.as_ref())
            .with_context(|| format!("creating working directory {}", layout.root().display()))?;
        info!(
            root = %layout.root().display(),
            inputs = input_dicoms.len(),
            "created reconstruction job"
        );

        Ok(Self {
            input_dicoms,
            layout,
            intermediate_images: Vec::new(),
            mask_images: Vec::new(),
            bias_corrected_images: Vec::new(),
            ctx,
        })
    }

    /// Create a job in `working_directory`, or in a fresh timestamped
    /// directory under the configured output root when none is given.
    pub fn from_settings(
        input_dicoms: Vec<PathBuf>,
        working_directory: Option<PathBuf>,
        settings: &Settings,
        ctx: JobContext,
    ) -> Result<Self> {
        let layout = match working_directory {
            Some(dir) => JobLayout::new(dir),
            None => JobLayout::timestamped(&settings.output_directory, Local::now()),
        };
        Self::new(input_dicoms, layout, ctx)
    }

    pub fn input_dicoms(&self) -> &[PathBuf] {
        &self.input_dicoms
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }

    pub fn working_directory(&self) -> &Path {
        self.layout.root()
    }

    pub fn intermediate_images(&self) -> &[PathBuf] {
        &self.intermediate_images
    }

    pub fn mask_images(&self) -> &[PathBuf] {
        &self.mask_images
    }

    pub fn bias_corrected_images(&self) -> &[PathBuf] {
        &self.bias_corrected_images
    }

    pub fn output_volume_path(&self) -> PathBuf {
        self.layout.output_volume()
    }

    pub fn output_dicom_directory(&self) -> PathBuf {
        self.layout.output_dicom()
    }

    fn env(&self) -> StageEnv<'_> {
        StageEnv {
            runner: self.ctx.runner.as_ref(),
            fs: self.ctx.fs.as_ref(),
            tools: &self.ctx.tools,
        }
    }

    /// Run a single stage by name.
    pub async fn run_stage(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::LoadExisting => self.load_existing_files(),
            Stage::ConvertInput => self.convert_dicoms().await,
            Stage::GenerateMasks => self.generate_masks().await,
            Stage::Reconstruct => self.reconstruct().await.map(|_| ()),
            Stage::ConvertOutput => self.convert_output_to_dicom().await.map(|_| ()),
        }
    }

    /// Seed the artifact lists from whatever a previous run left behind.
    ///
    /// - `*.nii` anywhere under the root (outside `bias_field/`) → intermediate images
    /// - `masks/**/*.nii.gz` → masks
    /// - `bias_field/**/*.nii` → bias-corrected images
    ///
    /// Paths already known are not added again, so repeated scans are
    /// idempotent.
    pub fn load_existing_files(&mut self) -> Result<()> {
        let fs = self.ctx.fs.as_ref();
        let root = self.layout.root();

        let images = find_files(fs, root, &["**/*.nii"], &["bias_field/**"])
            .context("scanning for existing NifTI images")?;
        for image in images {
            info!("Loading input NifTI {}", image.display());
            push_unique(&mut self.intermediate_images, image);
        }

        let masks = find_files(fs, root, &["masks/**/*.nii.gz"], &[])
            .context("scanning for existing masks")?;
        for mask in masks {
            info!("Loading input mask {}", mask.display());
            push_unique(&mut self.mask_images, mask);
        }

        let corrected = find_files(fs, root, &["bias_field/**/*.nii"], &[])
            .context("scanning for existing bias corrected images")?;
        for image in corrected {
            info!("Loading input bias corrected NifTI {}", image.display());
            push_unique(&mut self.bias_corrected_images, image);
        }

        Ok(())
    }

    /// Convert every input series, skipping ones already converted.
    pub async fn convert_dicoms(&mut self) -> Result<()> {
        let root = self.layout.root().to_path_buf();
        for dicom in self.input_dicoms.clone() {
            let nifti = stages::convert_to_nifti(self.env(), &dicom, &root).await?;
            push_unique(&mut self.intermediate_images, nifti);
        }
        Ok(())
    }

    /// Generate masks for all intermediate images; replaces the mask list.
    pub async fn generate_masks(&mut self) -> Result<()> {
        let masks = stages::generate_masks(
            self.env(),
            &self.intermediate_images,
            self.layout.root(),
            &self.layout.masks(),
        )
        .await?;
        self.mask_images = masks;
        Ok(())
    }

    /// Bias-field correct the intermediate images into `bias_field/`;
    /// replaces the bias-corrected list.
    ///
    /// Not part of the default five-stage run.
    pub async fn correct_bias_field(&mut self) -> Result<()> {
        let corrected = stages::correct_bias_field(
            self.env(),
            &self.intermediate_images,
            &self.mask_images,
            self.layout.root(),
            &self.layout.bias_field(),
        )
        .await?;
        self.bias_corrected_images = corrected;
        Ok(())
    }

    pub async fn reconstruct(&mut self) -> Result<i32> {
        stages::reconstruct_volume(
            self.env(),
            &self.intermediate_images,
            &self.mask_images,
            self.layout.root(),
            &self.layout.output_volume(),
            &self.ctx.params,
        )
        .await
    }

    pub async fn convert_output_to_dicom(&mut self) -> Result<i32> {
        stages::convert_to_dicom(
            self.env(),
            &self.layout.output_volume(),
            &self.layout.output_dicom(),
        )
        .await
    }
}

fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}
