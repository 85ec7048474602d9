// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod job;
pub mod logging;
pub mod stages;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::Settings;
use crate::engine::PipelineEvent;
use crate::errors::{PipelineError, Result};
use crate::exec::{ProcessReaper, ProcessRunner, TracingSink};
use crate::fs::{FileSystem, RealFileSystem};
use crate::job::{JobContext, ReconstructionJob};
use crate::types::{RunOutcome, Stage};

/// Text shown once a run is over, whatever its outcome.
pub const COMPLETION_MESSAGE: &str = "All jobs are finished";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - input discovery and the output root
/// - the process runner, job and background executor
/// - Ctrl-C handling (stop flag + process reaper)
/// - printing progress for the user
/// - listing and removing previous runs
pub async fn run(args: CliArgs, settings: Settings) -> Result<RunOutcome> {
    match args.command {
        Command::Run(run_args) => run_pipeline(run_args, settings).await,
        Command::CorrectBias { output_dir } => run_bias_correction(output_dir, settings).await,
        Command::Reap => {
            let report = ProcessReaper::from_settings(&settings).reap().await?;
            println!("killed {} process(es)", report.killed.len());
            Ok(RunOutcome::Finished)
        }
        Command::List => {
            let runs = job::list_runs(&RealFileSystem, &settings.output_directory)?;
            if runs.is_empty() {
                println!("no runs in {}", settings.output_directory.display());
            }
            for run in runs {
                let state = if run.reconstructed { "reconstructed" } else { "partial" };
                println!("{}  [{state}]", run.path.display());
            }
            Ok(RunOutcome::Finished)
        }
        Command::Remove { output_dir } => {
            let removed = job::remove_run(&RealFileSystem, &settings.output_directory, &output_dir)?;
            println!("removed {}", removed.display());
            Ok(RunOutcome::Finished)
        }
    }
}

async fn run_pipeline(args: RunArgs, settings: Settings) -> Result<RunOutcome> {
    let fs = RealFileSystem;
    let inputs = collect_inputs(&fs, &args.inputs, args.input_dir.as_deref())?;
    if inputs.is_empty() {
        return Err(PipelineError::Input(
            "no input DICOMs given (use --input or --input-dir)".to_string(),
        ));
    }
    for input in &inputs {
        info!("Add {} to the list of input DICOMs", input.display());
    }

    fs.create_dir_all(&settings.output_directory)?;

    let job = build_job(inputs, args.output_dir, &settings)?;

    if args.dry_run {
        print_dry_run(&job, &settings);
        return Ok(RunOutcome::Finished);
    }

    let mut handle = engine::start(job);

    // Ctrl-C → cooperative stop plus a hard stop of running tools.
    {
        let stop = handle.stop_flag();
        let settings = settings.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("stop requested; finishing after the current stage and killing tool processes");
            stop.set();
            if let Err(e) = ProcessReaper::from_settings(&settings).reap().await {
                error!(error = %e, "failed to kill pipeline tool processes");
            }
        });
    }

    while let Some(event) = handle.next_event().await {
        match event {
            PipelineEvent::StageStarted { stage } => debug!(stage = %stage, "stage started"),
            PipelineEvent::Progress { label, .. } => println!("{label}"),
            PipelineEvent::Completed => println!("{COMPLETION_MESSAGE}"),
        }
    }

    handle.wait().await
}

async fn run_bias_correction(output_dir: PathBuf, settings: Settings) -> Result<RunOutcome> {
    let mut job = build_job(Vec::new(), Some(output_dir), &settings)?;
    job.load_existing_files()?;

    match job.correct_bias_field().await {
        Ok(()) => {
            println!(
                "{} bias corrected image(s) in {}",
                job.bias_corrected_images().len(),
                job.layout().bias_field().display()
            );
            Ok(RunOutcome::Finished)
        }
        Err(PipelineError::Stage(err)) => {
            error!(kind = err.kind(), "{err}");
            Ok(RunOutcome::Failed)
        }
        Err(other) => Err(other),
    }
}

fn build_job(
    inputs: Vec<PathBuf>,
    working_directory: Option<PathBuf>,
    settings: &Settings,
) -> Result<ReconstructionJob> {
    let runner = ProcessRunner::from_settings(settings, Arc::new(TracingSink));
    let ctx = JobContext::from_settings(settings, Arc::new(runner));
    ReconstructionJob::from_settings(inputs, working_directory, settings, ctx)
}

/// Explicit inputs followed by every entry of `input_dir` (sorted by name).
pub fn collect_inputs(
    fs: &dyn FileSystem,
    inputs: &[PathBuf],
    input_dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let mut all = inputs.to_vec();
    if let Some(dir) = input_dir {
        let mut entries = fs.read_dir(dir)?;
        entries.sort();
        all.extend(entries);
    }

    let mut unique = Vec::with_capacity(all.len());
    for input in all {
        if !unique.contains(&input) {
            unique.push(input);
        }
    }
    Ok(unique)
}

/// Simple dry-run output: print the layout, inputs and stage plan.
fn print_dry_run(job: &ReconstructionJob, settings: &Settings) {
    let layout = job.layout();
    println!("niftymic-pipeline dry-run");
    println!("  working directory = {}", layout.root().display());
    println!("  masks             = {}", layout.masks().display());
    println!("  bias field        = {}", layout.bias_field().display());
    println!("  output volume     = {}", layout.output_volume().display());
    println!("  output dicom      = {}", layout.output_dicom().display());
    println!();

    println!("inputs ({}):", job.input_dicoms().len());
    for input in job.input_dicoms() {
        println!("  - {}", input.display());
    }
    println!();

    println!("tools:");
    println!("  dcm2niix  = {}", settings.dcm2niix_path.display());
    println!("  medcon    = {}", settings.medcon_path.display());
    println!(
        "  container = {} ({})",
        settings.container.runtime, settings.container.image
    );
    println!();

    println!("stages:");
    for stage in Stage::ALL {
        println!("  {}", stage.label());
    }

    debug!("dry-run complete (no execution)");
}
