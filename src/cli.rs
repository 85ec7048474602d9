// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `niftymic-pipeline`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "niftymic-pipeline",
    version,
    about = "Reconstruct a 3D volume from DICOM series with NiftyMIC.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML).
    ///
    /// Default: `NIFTYMIC_CONFIG`, else `~/NiftyMIC_GUI/niftymic.toml` if it
    /// exists, else built-in defaults.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `NIFTYMIC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the five-stage reconstruction pipeline.
    Run(RunArgs),

    /// Bias-field correct the images of an existing working directory.
    CorrectBias {
        /// Working directory of a previous run.
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,
    },

    /// Kill leftover pipeline tool processes.
    Reap,

    /// List previous runs under the output directory.
    List,

    /// Delete one run directory under the output directory.
    Remove {
        /// Run directory; a bare name is looked up under the output directory.
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Input DICOM series (repeatable).
    #[arg(long = "input", value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Directory whose entries are each used as one input DICOM series.
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Working directory to use (and resume from) instead of a fresh
    /// timestamped one.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the job layout and stage plan without running any tool.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_repeated_inputs() {
        let args = CliArgs::try_parse_from([
            "niftymic-pipeline",
            "run",
            "--input",
            "/dicom/a",
            "--input",
            "/dicom/b",
            "--output-dir",
            "/out/job",
        ])
        .unwrap();

        match args.command {
            Command::Run(run) => {
                assert_eq!(run.inputs, [PathBuf::from("/dicom/a"), PathBuf::from("/dicom/b")]);
                assert_eq!(run.output_dir, Some(PathBuf::from("/out/job")));
                assert!(!run.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let args =
            CliArgs::try_parse_from(["niftymic-pipeline", "reap", "--log-level", "debug"]).unwrap();
        assert!(matches!(args.command, Command::Reap));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }

    #[test]
    fn correct_bias_requires_output_dir() {
        assert!(CliArgs::try_parse_from(["niftymic-pipeline", "correct-bias"]).is_err());
    }

    #[test]
    fn run_management_subcommands() {
        let args = CliArgs::try_parse_from(["niftymic-pipeline", "list"]).unwrap();
        assert!(matches!(args.command, Command::List));

        let args = CliArgs::try_parse_from([
            "niftymic-pipeline",
            "remove",
            "--output-dir",
            "10-18-2026 09-05-07",
        ])
        .unwrap();
        match args.command {
            Command::Remove { output_dir } => {
                assert_eq!(output_dir, PathBuf::from("10-18-2026 09-05-07"))
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(CliArgs::try_parse_from(["niftymic-pipeline", "remove"]).is_err());
    }
}
