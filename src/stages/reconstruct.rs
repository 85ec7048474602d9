// src/stages/reconstruct.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{Result, StageError};

use super::toolset::RECONSTRUCT_SUBCOMMAND;
use super::StageEnv;

/// Numeric parameters of the volume reconstructor.
///
/// Deserialised from the `[reconstruction]` settings section; missing keys
/// take the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconstructionParams {
    /// Regularisation weight.
    pub alpha: f64,
    /// `1` enables outlier rejection of slices.
    pub outlier_rejection: u8,
    /// Outlier threshold for the first cycle.
    pub threshold_first: f64,
    /// Outlier threshold for later cycles.
    pub threshold: f64,
    /// `1` enables intensity correction.
    pub intensity_correction: u8,
    /// Output voxel size in mm.
    pub isotropic_resolution: f64,
    pub two_step_cycles: u32,
    pub verbose: u8,
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            outlier_rejection: 1,
            threshold_first: 0.5,
            threshold: 0.85,
            intensity_correction: 1,
            isotropic_resolution: 0.8,
            two_step_cycles: 3,
            verbose: 1,
        }
    }
}

impl ReconstructionParams {
    /// Command-line flags for these parameters, in the tool's order.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--alpha".to_string(),
            self.alpha.to_string(),
            "--outlier-rejection".to_string(),
            self.outlier_rejection.to_string(),
            "--threshold-first".to_string(),
            self.threshold_first.to_string(),
            "--threshold".to_string(),
            self.threshold.to_string(),
            "--intensity-correction".to_string(),
            self.intensity_correction.to_string(),
            "--isotropic-resolution".to_string(),
            self.isotropic_resolution.to_string(),
            "--two-step-cycles".to_string(),
            self.two_step_cycles.to_string(),
            "--verbose".to_string(),
            self.verbose.to_string(),
        ]
    }
}

/// Reconstruct one high-resolution volume from `images` and their `masks`.
///
/// Images and masks are each sorted independently before being passed, so
/// the invocation does not depend on input order. Pairing relies on the
/// file names of an image and its mask sorting into the same position.
pub async fn reconstruct_volume(
    env: StageEnv<'_>,
    images: &[PathBuf],
    masks: &[PathBuf],
    working_directory: &Path,
    output: &Path,
    params: &ReconstructionParams,
) -> Result<i32> {
    let mut images = images.to_vec();
    let mut masks = masks.to_vec();
    images.sort();
    masks.sort();

    let command = env
        .tools
        .container(working_directory, RECONSTRUCT_SUBCOMMAND)
        .arg("--filenames")
        .args(images.iter().map(|p| p.to_string_lossy().into_owned()))
        .arg("--filenames-masks")
        .args(masks.iter().map(|p| p.to_string_lossy().into_owned()))
        .args(params.to_args())
        .arg("--output")
        .path_arg(output);

    let exit_code = env.runner.run(&command).await?;
    if exit_code != 0 {
        return Err(StageError::Reconstruction { exit_code }.into());
    }
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_render_like_the_tool_expects() {
        let args = ReconstructionParams::default().to_args();
        assert_eq!(
            args,
            [
                "--alpha",
                "0.01",
                "--outlier-rejection",
                "1",
                "--threshold-first",
                "0.5",
                "--threshold",
                "0.85",
                "--intensity-correction",
                "1",
                "--isotropic-resolution",
                "0.8",
                "--two-step-cycles",
                "3",
                "--verbose",
                "1",
            ]
        );
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let params: ReconstructionParams = toml::from_str("isotropic_resolution = 1.2").unwrap();
        assert_eq!(params.isotropic_resolution, 1.2);
        assert_eq!(params.alpha, 0.01);
        assert_eq!(params.two_step_cycles, 3);
    }
}
