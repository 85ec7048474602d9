// src/stages/convert.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Result, StageError};
use crate::exec::command::path_str;

use super::StageEnv;

/// Convert one DICOM series into `<directory>/<series name>.nii`.
///
/// Does nothing if the target file already exists, so converting the same
/// series twice launches the converter at most once.
pub async fn convert_to_nifti(env: StageEnv<'_>, dicom: &Path, directory: &Path) -> Result<PathBuf> {
    let stem = series_name(dicom);
    let nifti = directory.join(format!("{stem}.nii"));

    if env.fs.exists(&nifti) {
        debug!(dicom = %dicom.display(), nifti = %nifti.display(), "already converted; skipping");
        return Ok(nifti);
    }

    let command = env
        .tools
        .native(&env.tools.dcm2niix)
        .arg("-o")
        .path_arg(directory)
        .arg("-f")
        .arg(stem)
        .path_arg(dicom);

    let exit_code = env.runner.run(&command).await?;
    if exit_code != 0 {
        return Err(StageError::Conversion {
            input: dicom.to_path_buf(),
            exit_code,
        }
        .into());
    }
    Ok(nifti)
}

/// Convert the reconstructed volume into a DICOM series written to
/// `directory` (the converter runs with `directory` as working directory).
pub async fn convert_to_dicom(env: StageEnv<'_>, volume: &Path, directory: &Path) -> Result<i32> {
    let command = env
        .tools
        .native(&env.tools.medcon)
        .arg("-f")
        .path_arg(volume)
        .args(["-split3d", "-c", "dicom"])
        .current_dir(directory);

    let exit_code = env.runner.run(&command).await?;
    if exit_code != 0 {
        return Err(StageError::OutputConversion {
            volume: volume.to_path_buf(),
            exit_code,
        }
        .into());
    }
    Ok(exit_code)
}

/// File name of the series path, used as the output stem.
fn series_name(dicom: &Path) -> String {
    dicom
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str(dicom))
}
