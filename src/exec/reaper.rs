// src/exec/reaper.rs

//! Forceful termination of leftover pipeline tool processes.
//!
//! The cooperative stop flag cannot interrupt an external process that is
//! already running, and processes started inside a container are not our
//! children at all. The reaper finds them by command line instead and kills
//! them, retrying with a fixed backoff until none are left.
//!
//! Matching is name-based, not PID/lineage-based, so it is best effort: any
//! host process that looks like a pipeline tool is a target.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::fs::{FileSystem, RealFileSystem};

/// One host process as seen by the reaper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub cmdline: Vec<String>,
}

/// Source of host processes and the means to kill them.
pub trait ProcessTable: Send + Sync {
    fn processes(&self) -> Result<Vec<ProcessEntry>>;
    fn kill(&self, pid: u32) -> Result<()>;
}

/// Process table backed by `/proc`.
///
/// Linux only: hosts without procfs (macOS, the BSDs without `linprocfs`)
/// get an error from [`ProcessTable::processes`] instead of an empty list.
#[derive(Debug, Clone)]
pub struct ProcfsTable {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl ProcfsTable {
    pub fn new() -> Self {
        Self::with_root(Arc::new(RealFileSystem), "/proc")
    }

    pub fn with_root(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }
}

impl Default for ProcfsTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for ProcfsTable {
    fn processes(&self) -> Result<Vec<ProcessEntry>> {
        if !self.fs.is_dir(&self.root) {
            bail!(
                "process table {} is unavailable; killing tool processes needs procfs (Linux)",
                self.root.display()
            );
        }

        let mut entries = Vec::new();
        for dir in self.fs.read_dir(&self.root)? {
            let Some(pid) = dir
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };

            // The process may have exited since the directory was listed.
            let Ok(raw) = self.fs.read(&dir.join("cmdline")) else {
                continue;
            };
            // Arguments are arbitrary bytes; file names need not be UTF-8.
            let cmdline: Vec<String> = raw
                .split(|b| *b == 0)
                .filter(|part| !part.is_empty())
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect();

            // Kernel threads have an empty command line.
            if !cmdline.is_empty() {
                entries.push(ProcessEntry { pid, cmdline });
            }
        }
        Ok(entries)
    }

    fn kill(&self, pid: u32) -> Result<()> {
        kill_process(pid)
    }
}

#[cfg(unix)]
fn kill_process(pid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)?;
    match kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => bail!("failed to kill process {pid}: {errno}"),
    }
}

#[cfg(not(unix))]
fn kill_process(pid: u32) -> Result<()> {
    bail!("killing process {pid} is only supported on unix hosts")
}

/// Decides whether a command line belongs to a pipeline tool.
///
/// A process matches when one argument's file name starts with the
/// interpreter name (`python`, `python3`, `/usr/bin/python3.8`, ...) and any
/// argument contains one of the marker strings. A blank interpreter matches
/// nothing.
#[derive(Debug, Clone)]
pub struct ProcessMatcher {
    interpreter: String,
    markers: Vec<String>,
}

impl ProcessMatcher {
    pub fn new<I, S>(interpreter: impl Into<String>, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interpreter: interpreter.into(),
            markers: markers
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, cmdline: &[String]) -> bool {
        if self.interpreter.trim().is_empty() {
            return false;
        }
        let interpreted = cmdline.iter().any(|arg| {
            Path::new(arg)
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&self.interpreter))
        });
        interpreted
            && cmdline
                .iter()
                .any(|arg| self.markers.iter().any(|m| arg.contains(m.as_str())))
    }
}

/// Result of a reaping pass.
#[derive(Debug, Clone, Default)]
pub struct ReapReport {
    /// Every distinct process a kill was issued for.
    pub killed: Vec<ProcessEntry>,
    /// Number of scans performed, including the final empty one.
    pub attempts: u32,
}

pub struct ProcessReaper<T: ProcessTable> {
    table: T,
    matcher: ProcessMatcher,
    backoff: Duration,
    max_attempts: u32,
    own_pid: u32,
}

impl ProcessReaper<ProcfsTable> {
    /// Reaper over the host `/proc`, configured from `[reaper]`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ProcfsTable::new(),
            ProcessMatcher::new(
                settings.reaper.interpreter.clone(),
                settings.reaper.markers.clone(),
            ),
        )
        .with_backoff(settings.reaper_backoff())
        .with_max_attempts(settings.reaper.max_attempts)
    }
}

impl<T: ProcessTable> ProcessReaper<T> {
    pub fn new(table: T, matcher: ProcessMatcher) -> Self {
        Self {
            table,
            matcher,
            backoff: Duration::from_millis(500),
            max_attempts: 40,
            own_pid: std::process::id(),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Host processes that currently look like pipeline tools.
    pub fn find_matching(&self) -> Result<Vec<ProcessEntry>> {
        Ok(self
            .table
            .processes()?
            .into_iter()
            .filter(|p| p.pid != self.own_pid && self.matcher.matches(&p.cmdline))
            .collect())
    }

    /// Kill matching processes until a scan comes back empty.
    ///
    /// Scans are separated by the configured backoff. Gives up with an
    /// error once `max_attempts` scans still found survivors.
    pub async fn reap(&self) -> Result<ReapReport> {
        let mut report = ReapReport::default();

        while report.attempts < self.max_attempts {
            report.attempts += 1;

            let targets = self.find_matching()?;
            if targets.is_empty() {
                debug!(attempts = report.attempts, "no pipeline tool processes left");
                return Ok(report);
            }

            for process in targets {
                info!(pid = process.pid, cmdline = ?process.cmdline, "Kill process");
                if let Err(e) = self.table.kill(process.pid) {
                    warn!(pid = process.pid, error = %e, "failed to kill process");
                }
                if !report.killed.iter().any(|k| k.pid == process.pid) {
                    report.killed.push(process);
                }
            }

            tokio::time::sleep(self.backoff).await;
        }

        let survivors = self.find_matching()?;
        if survivors.is_empty() {
            return Ok(report);
        }
        bail!(
            "{} pipeline tool process(es) still alive after {} attempts",
            survivors.len(),
            report.attempts
        )
    }
}
