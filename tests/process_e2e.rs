// tests/process_e2e.rs
//
// Full runs through the real process runner, with small shell scripts
// standing in for the converters and the container runtime.

#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use niftymic_pipeline::engine::{self, PipelineEvent};
use niftymic_pipeline::errors::{PipelineError, StageError};
use niftymic_pipeline::exec::{CommandRunner, CommandSpec, ProcessRunner};
use niftymic_pipeline::fs::RealFileSystem;
use niftymic_pipeline::job::{JobContext, JobLayout, ReconstructionJob};
use niftymic_pipeline::stages::Toolset;
use niftymic_pipeline::types::RunOutcome;
use niftymic_test_utils::fake_runner::RecordingSink;
use niftymic_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

/// `dcm2niix -o DIR -f NAME INPUT` → `DIR/NAME.nii`
const DCM2NIIX: &str = r#"#!/bin/sh
echo "dcm2niix $*"
touch "$2/$4.nii"
"#;

/// `medcon -f VOLUME -split3d -c dicom`, run inside the output directory.
const MEDCON: &str = r#"#!/bin/sh
echo "medcon $*"
touch m000-output.dcm m001-output.dcm
"#;

/// `docker run --rm -t -v M:M IMAGE SUBCOMMAND ...`
const DOCKER: &str = r#"#!/bin/sh
shift 6
sub="$1"
shift
echo "container $sub" >&2
case "$sub" in
  niftymic_segment_fetal_brains)
    files=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --filenames) shift; while [ $# -gt 0 ] && [ "${1#--}" = "$1" ]; do files="$files $1"; shift; done ;;
        --dir-output) out="$2"; shift 2 ;;
        *) shift ;;
      esac
    done
    for f in $files; do
      base=$(basename "$f" .nii)
      touch "$out/${base}_mask.nii.gz"
    done
    ;;
  niftymic_reconstruct_volume)
    while [ $# -gt 0 ]; do
      if [ "$1" = "--output" ]; then touch "$2"; fi
      shift
    done
    ;;
esac
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> std::io::Result<()> {
    let path = dir.join(name);
    fs::write(&path, body)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
}

#[tokio::test]
async fn full_run_with_real_processes() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let bin = tmp.path().join("bin");
    fs::create_dir_all(&bin)?;
    write_script(&bin, "dcm2niix", DCM2NIIX)?;
    write_script(&bin, "medcon", MEDCON)?;
    write_script(&bin, "docker", DOCKER)?;

    let dicom = tmp.path().join("dicom");
    fs::create_dir_all(dicom.join("series1"))?;
    fs::create_dir_all(dicom.join("series2"))?;

    let sink = RecordingSink::new();
    let runner = ProcessRunner::new(Arc::new(sink.clone())).with_timeout(Duration::from_secs(30));
    let ctx = JobContext {
        runner: Arc::new(runner),
        fs: Arc::new(RealFileSystem),
        tools: Toolset {
            dcm2niix: bin.join("dcm2niix"),
            medcon: bin.join("medcon"),
            container_runtime: bin.join("docker").to_string_lossy().into_owned(),
            image: "renbem/niftymic".to_string(),
        },
        params: Default::default(),
    };
    let root = tmp.path().join("output").join("job");
    let job = ReconstructionJob::new(
        vec![dicom.join("series1"), dicom.join("series2")],
        JobLayout::new(&root),
        ctx,
    )?;

    let mut handle = engine::start(job);
    let mut labels = Vec::new();
    let mut completed = 0;
    while let Some(event) = handle.next_event().await {
        match event {
            PipelineEvent::Progress { label, .. } => labels.push(label),
            PipelineEvent::Completed => completed += 1,
            PipelineEvent::StageStarted { .. } => {}
        }
    }
    let outcome = handle.wait().await?;

    assert_eq!(outcome, RunOutcome::Finished);
    assert_eq!(labels.len(), 5);
    assert!(labels[4].starts_with("5/5"));
    assert_eq!(completed, 1);

    assert!(root.join("series1.nii").is_file());
    assert!(root.join("masks/series2_mask.nii.gz").is_file());
    assert!(root.join("output.nii.gz").is_file());
    assert!(root.join("output.dicom/m000-output.dcm").is_file());

    let lines = sink.lines();
    assert!(lines.iter().any(|l| l.starts_with("dcm2niix -o")));
    assert!(lines.iter().any(|l| l == "container niftymic_segment_fetal_brains"));
    assert!(lines.iter().any(|l| l == "container niftymic_reconstruct_volume"));
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() -> TestResult {
    init_tracing();
    let runner = ProcessRunner::new(Arc::new(RecordingSink::new()));
    let spec = CommandSpec::new("/nonexistent/niftymic-tool");

    let err = runner.run(&spec).await.unwrap_err();
    assert!(matches!(err, StageError::Spawn { .. }));
    assert_eq!(err.kind(), "process");

    let wrapped: PipelineError = err.into();
    assert!(matches!(wrapped, PipelineError::Stage(_)));
    Ok(())
}
