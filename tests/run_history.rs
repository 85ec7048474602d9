// tests/run_history.rs

use std::error::Error;
use std::fs;
use std::path::Path;

use niftymic_pipeline::errors::PipelineError;
use niftymic_pipeline::fs::RealFileSystem;
use niftymic_pipeline::job::{list_runs, remove_run};

type TestResult = Result<(), Box<dyn Error>>;

fn make_run(root: &Path, name: &str, reconstructed: bool) -> std::io::Result<()> {
    let dir = root.join(name);
    fs::create_dir_all(dir.join("masks"))?;
    if reconstructed {
        fs::write(dir.join("output.nii.gz"), b"volume")?;
    }
    Ok(())
}

#[test]
fn lists_runs_on_disk() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("output");
    make_run(&out, "10-18-2026 09-05-07", true)?;
    make_run(&out, "03-01-2026 17-45-00", false)?;
    fs::create_dir_all(out.join("not-a-run"))?;

    let runs = list_runs(&RealFileSystem, &out)?;

    assert_eq!(runs.len(), 2);
    assert!(runs[0].path.ends_with("03-01-2026 17-45-00"));
    assert!(!runs[0].reconstructed);
    assert!(runs[1].path.ends_with("10-18-2026 09-05-07"));
    assert!(runs[1].reconstructed);
    Ok(())
}

#[test]
fn removes_a_run_by_absolute_path() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("output");
    make_run(&out, "10-18-2026 09-05-07", true)?;
    make_run(&out, "10-19-2026 08-00-00", false)?;

    remove_run(&RealFileSystem, &out, &out.join("10-18-2026 09-05-07"))?;

    assert!(!out.join("10-18-2026 09-05-07").exists());
    assert!(out.join("10-19-2026 08-00-00").is_dir());
    Ok(())
}

#[test]
fn refuses_to_remove_outside_the_output_root() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("output");
    make_run(&out, "10-18-2026 09-05-07", false)?;
    let elsewhere = tmp.path().join("patient-data");
    fs::create_dir_all(&elsewhere)?;

    for target in [
        elsewhere.clone(),
        out.clone(),
        out.join("10-18-2026 09-05-07").join(".."),
        Path::new("../patient-data").to_path_buf(),
        out.join("10-18-2026 09-05-07").join("masks"),
    ] {
        let err = remove_run(&RealFileSystem, &out, &target).unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)), "{}: {err:?}", target.display());
    }

    assert!(elsewhere.is_dir());
    assert!(out.join("10-18-2026 09-05-07").join("masks").is_dir());
    Ok(())
}

#[cfg(unix)]
#[test]
fn refuses_symlinks_leading_out_of_the_output_root() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("output");
    fs::create_dir_all(&out)?;
    let elsewhere = tmp.path().join("patient-data");
    fs::create_dir_all(&elsewhere)?;
    std::os::unix::fs::symlink(&elsewhere, out.join("10-18-2026 09-05-07"))?;

    let err = remove_run(&RealFileSystem, &out, Path::new("10-18-2026 09-05-07")).unwrap_err();

    assert!(matches!(err, PipelineError::Input(_)));
    assert!(elsewhere.is_dir());
    Ok(())
}
