// src/exec/command.rs

//! Fully-built external invocations.

use std::fmt;
use std::path::{Path, PathBuf};

/// A single external command line: program, arguments and an optional
/// working directory.
///
/// Stage functions build these; a [`CommandRunner`](super::CommandRunner)
/// executes them. Two specs compare equal exactly when they would launch the
/// same invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path_str(path))
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Position of `flag` in the argument list, if present.
    pub fn flag_index(&self, flag: &str) -> Option<usize> {
        self.args.iter().position(|a| a == flag)
    }

    /// Arguments following `flag` up to the next `--` flag.
    pub fn values_of(&self, flag: &str) -> &[String] {
        let Some(start) = self.flag_index(flag).map(|i| i + 1) else {
            return &[];
        };
        let end = self.args[start..]
            .iter()
            .position(|a| a.starts_with("--"))
            .map_or(self.args.len(), |offset| start + offset);
        &self.args[start..end]
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Lossy string form of a path, as passed on a command line.
pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
