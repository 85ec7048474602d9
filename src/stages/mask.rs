// src/stages/mask.rs

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::errors::{Result, StageError};
use crate::fs::find_files;

use super::toolset::SEGMENT_SUBCOMMAND;
use super::StageEnv;

/// Suffix pattern identifying mask files.
pub const MASK_PATTERN: &str = "**/*.nii.gz";

/// Segment every image in `images`, writing masks to `directory`.
///
/// `source_root` is bind-mounted into the container and must contain both
/// the images and `directory`.
///
/// On success, returns **every** mask file under `directory`, not just the
/// ones produced by this call; callers replace their mask list with it.
pub async fn generate_masks(
    env: StageEnv<'_>,
    images: &[PathBuf],
    source_root: &Path,
    directory: &Path,
) -> Result<Vec<PathBuf>> {
    if images.is_empty() {
        warn!("generating masks without any input images");
    }

    let command = env
        .tools
        .container(source_root, SEGMENT_SUBCOMMAND)
        .arg("--filenames")
        .args(images.iter().map(|p| p.to_string_lossy().into_owned()))
        .arg("--dir-output")
        .path_arg(directory);

    let exit_code = env.runner.run(&command).await?;
    if exit_code != 0 {
        return Err(StageError::MaskGeneration { exit_code }.into());
    }

    let masks = find_files(env.fs, directory, &[MASK_PATTERN], &[])
        .with_context(|| format!("listing masks in {}", directory.display()))?;
    info!(count = masks.len(), "masks available");
    Ok(masks)
}
