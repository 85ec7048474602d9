// src/exec/runner.rs

//! Running a single external command to completion.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::errors::StageError;
use crate::exec::command::CommandSpec;
use crate::exec::sink::LogSink;

/// Ceiling for a single external invocation unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

type OutputStream = Box<dyn AsyncRead + Unpin + Send>;

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<i32, StageError>> + Send + 'a>>;

/// Trait abstracting how an external command is executed.
///
/// Production code uses [`ProcessRunner`]; tests provide implementations
/// that record invocations instead of spawning processes.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion and return its exit code.
    ///
    /// A non-zero exit code is **not** an error at this level; only a failure
    /// to spawn, wait for, or finish the process in time is.
    fn run<'a>(&'a self, command: &'a CommandSpec) -> RunFuture<'a>;
}

/// Spawns real OS processes with `tokio::process::Command`.
///
/// - stdout and stderr share one pipe (like `2>&1`), so the [`LogSink`] sees
///   lines in the order the tool wrote them, while it is still running.
/// - The inherited environment is passed through, plus any overrides added
///   with [`ProcessRunner::with_env`].
/// - There is no mid-flight cancellation hook: a call blocks until the
///   process exits or the timeout elapses. Hard stops go through the reaper.
pub struct ProcessRunner {
    sink: Arc<dyn LogSink>,
    timeout: Duration,
    env: Vec<(String, String)>,
}

impl ProcessRunner {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            timeout: DEFAULT_TIMEOUT,
            env: Vec::new(),
        }
    }

    /// Runner configured with the process timeout and the container socket
    /// variable from `settings`.
    pub fn from_settings(settings: &Settings, sink: Arc<dyn LogSink>) -> Self {
        Self::new(sink)
            .with_timeout(settings.process_timeout())
            .with_env(
                settings.container.socket_variable.clone(),
                settings.container.socket.clone(),
            )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    async fn execute(&self, command: &CommandSpec) -> Result<i32, StageError> {
        info!(command = %command, "Execute");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let (mut child, streams) = spawn_with_combined_output(cmd).map_err(|source| {
            StageError::Spawn {
                program: command.program.clone(),
                source,
            }
        })?;

        let (line_tx, mut line_rx) = mpsc::channel::<String>(256);
        for stream in streams {
            forward_lines(stream, line_tx.clone());
        }
        drop(line_tx);

        let sink = Arc::clone(&self.sink);
        let waited = tokio::time::timeout(self.timeout, async {
            while let Some(line) = line_rx.recv().await {
                sink.append(&line);
            }
            child.wait().await
        })
        .await;

        match waited {
            Ok(Ok(status)) => {
                let code = status.code().unwrap_or(-1);
                info!(
                    program = %command.program,
                    exit_code = code,
                    success = status.success(),
                    "process exited"
                );
                Ok(code)
            }
            Ok(Err(source)) => Err(StageError::Wait {
                program: command.program.clone(),
                source,
            }),
            Err(_) => {
                warn!(
                    program = %command.program,
                    timeout = ?self.timeout,
                    "process exceeded its time limit; killing it"
                );
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "failed to kill timed-out process");
                }
                Err(StageError::Timeout {
                    program: command.program.clone(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> RunFuture<'a> {
        Box::pin(self.execute(command))
    }
}

/// Spawn `cmd` with stdout and stderr redirected into a single pipe and
/// return the child plus the pipe's read end.
#[cfg(unix)]
fn spawn_with_combined_output(mut cmd: Command) -> io::Result<(Child, Vec<OutputStream>)> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let (reader, writer) = io::pipe()?;
    let writer_for_stderr = writer.try_clone()?;
    cmd.stdout(Stdio::from(writer))
        .stderr(Stdio::from(writer_for_stderr));

    let child = cmd.spawn()?;
    // `cmd` still holds our copies of the write end; the reader only sees EOF
    // once they are closed.
    drop(cmd);

    let receiver = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    Ok((child, vec![Box::new(receiver)]))
}

/// Without a shareable pipe, both streams are read separately and their
/// relative order is approximate.
#[cfg(not(unix))]
fn spawn_with_combined_output(mut cmd: Command) -> io::Result<(Child, Vec<OutputStream>)> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let mut streams: Vec<OutputStream> = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        streams.push(Box::new(stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        streams.push(Box::new(stderr));
    }
    Ok((child, streams))
}

/// Read `reader` line by line and push each (lossily decoded) line into `tx`.
fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim().to_string();
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "stopped reading process output");
                    break;
                }
            }
        }
    });
}
