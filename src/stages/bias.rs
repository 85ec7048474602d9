// src/stages/bias.rs

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

use crate::errors::{Result, StageError};
use crate::fs::find_files;

use super::toolset::BIAS_FIELD_SUBCOMMAND;
use super::StageEnv;

/// Pattern identifying corrected images in the output directory.
pub const CORRECTED_PATTERN: &str = "**/*.nii";

/// Run bias-field correction once per image/mask pair.
///
/// Images and masks are each sorted and then paired by position; nothing
/// checks that a mask actually belongs to its image. Unpaired leftovers are
/// skipped. The first failing pair aborts the whole call.
///
/// Returns every corrected image under `directory`.
pub async fn correct_bias_field(
    env: StageEnv<'_>,
    images: &[PathBuf],
    masks: &[PathBuf],
    source_root: &Path,
    directory: &Path,
) -> Result<Vec<PathBuf>> {
    let mut images = images.to_vec();
    let mut masks = masks.to_vec();
    images.sort();
    masks.sort();

    if images.len() != masks.len() {
        warn!(
            images = images.len(),
            masks = masks.len(),
            "image and mask counts differ; unpaired files are skipped"
        );
    }

    for (image, mask) in images.iter().zip(masks.iter()) {
        let Some(name) = image.file_name() else {
            continue;
        };
        let output = directory.join(name);

        let command = env
            .tools
            .container(source_root, BIAS_FIELD_SUBCOMMAND)
            .arg("--filename")
            .path_arg(image)
            .arg("--filename-mask")
            .path_arg(mask)
            .arg("--output")
            .path_arg(&output);

        let exit_code = env.runner.run(&command).await?;
        if exit_code != 0 {
            return Err(StageError::BiasCorrection {
                image: image.clone(),
                mask: mask.clone(),
                exit_code,
            }
            .into());
        }
    }

    let corrected = find_files(env.fs, directory, &[CORRECTED_PATTERN], &[])
        .with_context(|| format!("listing corrected images in {}", directory.display()))?;
    Ok(corrected)
}
