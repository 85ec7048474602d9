// tests/executor_flow.rs

mod common;
use crate::common::{fake_runner, init_tracing, mock_job};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use niftymic_pipeline::engine::{self, JobExecutor, PipelineEvent, StopFlag};
use niftymic_pipeline::fs::mock::MockFileSystem;
use niftymic_pipeline::fs::FileSystem;
use niftymic_pipeline::stages::toolset::{RECONSTRUCT_SUBCOMMAND, SEGMENT_SUBCOMMAND};
use niftymic_pipeline::types::{RunOutcome, Stage};
use niftymic_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

/// Drain every event currently buffered in `rx`.
fn drain(rx: &mut mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

fn progress_labels(events: &[PipelineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Progress { label, .. } => Some(label.clone()),
            _ => None,
        })
        .collect()
}

fn completed_count(events: &[PipelineEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Completed))
        .count()
}

#[tokio::test]
async fn full_run_reports_every_stage_and_produces_outputs() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let runner = Arc::new(fake_runner(&fs));
    let job = mock_job(&fs, &["/dicom/s1", "/dicom/s2"], Arc::clone(&runner));

    let mut handle = engine::start(job);
    let mut events = Vec::new();
    while let Some(ev) = with_timeout(handle.next_event()).await {
        events.push(ev);
    }
    let outcome = with_timeout(handle.wait()).await?;

    assert_eq!(outcome, RunOutcome::Finished);
    assert_eq!(
        progress_labels(&events),
        Stage::ALL.iter().map(|s| s.label()).collect::<Vec<_>>()
    );
    assert!(progress_labels(&events)[0].starts_with("1/5"));
    assert_eq!(events.last(), Some(&PipelineEvent::Completed));
    assert_eq!(completed_count(&events), 1);

    assert_eq!(
        runner.tools_run(),
        ["dcm2niix", "dcm2niix", SEGMENT_SUBCOMMAND, RECONSTRUCT_SUBCOMMAND, "medcon"]
    );
    assert!(fs.is_file(Path::new("/data/job/output.nii.gz")));
    assert!(!fs.read_dir(Path::new("/data/job/output.dicom"))?.is_empty());
    Ok(())
}

#[tokio::test]
async fn failure_in_conversion_skips_remaining_stages() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let runner = Arc::new(fake_runner(&fs).fail("dcm2niix", 1));
    let mut job = mock_job(&fs, &["/dicom/s1"], Arc::clone(&runner));

    let (tx, mut rx) = mpsc::channel(32);
    let executor = JobExecutor::new(tx, StopFlag::new());
    let outcome = with_timeout(executor.run(&mut job)).await?;
    let events = drain(&mut rx);

    assert_eq!(outcome, RunOutcome::Failed);
    assert_eq!(progress_labels(&events), [Stage::LoadExisting.label()]);
    assert_eq!(events.last(), Some(&PipelineEvent::Completed));
    assert_eq!(completed_count(&events), 1);
    assert_eq!(runner.tools_run(), ["dcm2niix"]);
    Ok(())
}

#[tokio::test]
async fn stop_requested_during_a_stage_ends_the_run_at_the_next_boundary() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let stop = StopFlag::new();
    let stop_in_hook = stop.clone();
    let runner = Arc::new(fake_runner(&fs).on_run("dcm2niix", move |_| stop_in_hook.set()));
    let mut job = mock_job(&fs, &["/dicom/s1"], Arc::clone(&runner));

    let (tx, mut rx) = mpsc::channel(32);
    let executor = JobExecutor::new(tx, stop);
    let outcome = with_timeout(executor.run(&mut job)).await?;
    let events = drain(&mut rx);

    assert_eq!(outcome, RunOutcome::Stopped);
    // The running stage finishes; nothing after it starts.
    assert_eq!(
        progress_labels(&events),
        [Stage::LoadExisting.label(), Stage::ConvertInput.label()]
    );
    assert!(!events.contains(&PipelineEvent::StageStarted {
        stage: Stage::GenerateMasks
    }));
    assert_eq!(completed_count(&events), 1);
    assert_eq!(runner.tools_run(), ["dcm2niix"]);
    Ok(())
}

#[tokio::test]
async fn stop_before_start_runs_nothing_but_still_completes() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let runner = Arc::new(fake_runner(&fs));
    let mut job = mock_job(&fs, &["/dicom/s1"], Arc::clone(&runner));

    let (tx, mut rx) = mpsc::channel(32);
    let stop = StopFlag::new();
    stop.set();
    let executor = JobExecutor::new(tx, stop);
    let outcome = with_timeout(executor.run(&mut job)).await?;

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(drain(&mut rx), [PipelineEvent::Completed]);
    assert!(runner.tools_run().is_empty());
    Ok(())
}

#[tokio::test]
async fn resumed_job_reuses_existing_conversions() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/data/job/s1.nii", b"");
    fs.add_file("/data/job/masks/s1_mask.nii.gz", b"");

    let runner = Arc::new(fake_runner(&fs));
    let job = mock_job(&fs, &["/dicom/s1"], Arc::clone(&runner));

    let mut handle = engine::start(job);
    while with_timeout(handle.next_event()).await.is_some() {}
    let outcome = with_timeout(handle.wait()).await?;

    assert_eq!(outcome, RunOutcome::Finished);
    assert!(runner.commands_for("dcm2niix").is_empty());
    Ok(())
}

#[tokio::test]
async fn run_continues_when_the_view_goes_away() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let runner = Arc::new(fake_runner(&fs));
    let mut job = mock_job(&fs, &["/dicom/s1"], Arc::clone(&runner));

    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let executor = JobExecutor::new(tx, StopFlag::new());
    let outcome = with_timeout(executor.run(&mut job)).await?;

    assert_eq!(outcome, RunOutcome::Finished);
    assert_eq!(runner.tools_run().len(), 4);
    Ok(())
}

#[tokio::test]
async fn stop_during_the_last_stage_counts_as_finished() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let stop = StopFlag::new();
    let stop_in_hook = stop.clone();
    let runner = Arc::new(fake_runner(&fs).on_run("medcon", move |_| stop_in_hook.set()));
    let mut job = mock_job(&fs, &["/dicom/s1"], Arc::clone(&runner));

    let (tx, mut rx) = mpsc::channel(32);
    let executor = JobExecutor::new(tx, stop);
    let outcome = with_timeout(executor.run(&mut job)).await?;
    let events = drain(&mut rx);

    assert_eq!(outcome, RunOutcome::Finished);
    assert_eq!(progress_labels(&events).len(), 5);
    assert_eq!(completed_count(&events), 1);
    Ok(())
}
