// src/job/history.rs

//! Previous runs under the output root: listing them to pick a resume
//! target, and removing one.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDateTime;
use tracing::info;

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;

use super::layout::{JobLayout, TIMESTAMP_FORMAT};

/// One timestamped working directory found under the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEntry {
    pub path: PathBuf,
    pub started: NaiveDateTime,
    /// Whether the reconstructed volume exists.
    pub reconstructed: bool,
}

/// Timestamped run directories directly under `output_root`, oldest first.
///
/// Directories whose name is not a run timestamp are ignored. A missing
/// output root simply has no runs.
pub fn list_runs(fs: &dyn FileSystem, output_root: &Path) -> Result<Vec<RunEntry>> {
    if !fs.is_dir(output_root) {
        return Ok(Vec::new());
    }

    let mut runs = Vec::new();
    let entries = fs
        .read_dir(output_root)
        .with_context(|| format!("listing runs in {}", output_root.display()))?;
    for path in entries {
        if !fs.is_dir(&path) {
            continue;
        }
        let Some(started) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NaiveDateTime::parse_from_str(n, TIMESTAMP_FORMAT).ok())
        else {
            continue;
        };
        let reconstructed = fs.is_file(&JobLayout::new(&path).output_volume());
        runs.push(RunEntry {
            path,
            started,
            reconstructed,
        });
    }

    runs.sort_by(|a, b| a.started.cmp(&b.started).then_with(|| a.path.cmp(&b.path)));
    Ok(runs)
}

/// Delete the run directory `target` and everything in it.
///
/// A relative `target` is taken relative to `output_root`. Only a directory
/// directly below the output root is accepted; anything else, including the
/// root itself and paths escaping it through `..` or symlinks, is refused.
/// Returns the directory that was removed.
pub fn remove_run(fs: &dyn FileSystem, output_root: &Path, target: &Path) -> Result<PathBuf> {
    let root = fs
        .canonicalize(output_root)
        .with_context(|| format!("output directory {}", output_root.display()))?;
    let requested = if target.is_relative() {
        root.join(target)
    } else {
        target.to_path_buf()
    };

    if !fs.is_dir(&requested) {
        return Err(PipelineError::Input(format!(
            "{} is not a run directory",
            requested.display()
        )));
    }
    let resolved = fs.canonicalize(&requested)?;

    let escapes = resolved
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir));
    if escapes || resolved.parent() != Some(root.as_path()) {
        return Err(PipelineError::Input(format!(
            "refusing to remove {}: not a run directory under {}",
            requested.display(),
            root.display()
        )));
    }

    fs.remove_dir_all(&resolved)?;
    info!(path = %resolved.display(), "Removed run directory");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn runs_fixture() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/out/10-18-2026 09-05-07/output.nii.gz", b"");
        fs.add_file("/out/01-02-2025 12-00-00/a.nii", b"");
        fs.add_dir("/out/scratch");
        fs.add_file("/out/notes.txt", b"");
        fs
    }

    #[test]
    fn lists_only_timestamped_runs_in_chronological_order() {
        let fs = runs_fixture();
        let runs = list_runs(&fs, Path::new("/out")).unwrap();

        let names: Vec<_> = runs.iter().map(|r| r.path.clone()).collect();
        assert_eq!(
            names,
            [
                PathBuf::from("/out/01-02-2025 12-00-00"),
                PathBuf::from("/out/10-18-2026 09-05-07"),
            ]
        );
        assert!(!runs[0].reconstructed);
        assert!(runs[1].reconstructed);
    }

    #[test]
    fn missing_output_root_has_no_runs() {
        let fs = MockFileSystem::new();
        assert!(list_runs(&fs, Path::new("/nowhere")).unwrap().is_empty());
    }

    #[test]
    fn removes_a_run_given_by_name() {
        let fs = runs_fixture();
        let removed = remove_run(&fs, Path::new("/out"), Path::new("01-02-2025 12-00-00")).unwrap();

        assert_eq!(removed, PathBuf::from("/out/01-02-2025 12-00-00"));
        assert!(!fs.exists(Path::new("/out/01-02-2025 12-00-00/a.nii")));
        assert!(fs.exists(Path::new("/out/10-18-2026 09-05-07/output.nii.gz")));
    }

    #[test]
    fn refuses_paths_outside_the_output_root() {
        let fs = runs_fixture();
        fs.add_dir("/home/user/data");

        for target in ["/home/user/data", "/out", "/out/scratch/..", "/out/10-18-2026 09-05-07/masks"] {
            fs.add_dir("/out/10-18-2026 09-05-07/masks");
            let err = remove_run(&fs, Path::new("/out"), Path::new(target)).unwrap_err();
            assert!(matches!(err, PipelineError::Input(_)), "{target}: {err:?}");
        }
        assert!(fs.is_dir(Path::new("/home/user/data")));
        assert!(fs.is_dir(Path::new("/out/10-18-2026 09-05-07/masks")));
    }

    #[test]
    fn refuses_files_and_missing_directories() {
        let fs = runs_fixture();
        assert!(remove_run(&fs, Path::new("/out"), Path::new("notes.txt")).is_err());
        assert!(remove_run(&fs, Path::new("/out"), Path::new("gone")).is_err());
        assert!(fs.is_file(Path::new("/out/notes.txt")));
    }
}
