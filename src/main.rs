// src/main.rs

use std::process::ExitCode;

use niftymic_pipeline::types::RunOutcome;
use niftymic_pipeline::{cli, config, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(RunOutcome::Failed) => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("niftymic-pipeline error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> anyhow::Result<RunOutcome> {
    let args = cli::parse();
    let settings = config::load_settings(args.config.as_deref())?;
    logging::init_logging(args.log_level, &settings)?;
    Ok(run(args, settings).await?)
}
