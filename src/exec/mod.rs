// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] holds [`CommandSpec`], a fully-built external invocation.
//! - [`runner`] provides the [`CommandRunner`] trait and the production
//!   [`ProcessRunner`], which spawns the command with `tokio::process`,
//!   streams its combined output into a [`LogSink`] and enforces a timeout.
//! - [`sink`] is the "append log line" abstraction the runner writes to.
//! - [`reaper`] finds and kills leftover tool processes for hard stops.

pub mod command;
pub mod reaper;
pub mod runner;
pub mod sink;

pub use command::CommandSpec;
pub use reaper::{ProcessEntry, ProcessMatcher, ProcessReaper, ProcessTable, ProcfsTable, ReapReport};
pub use runner::{CommandRunner, ProcessRunner, RunFuture};
pub use sink::{LogSink, TracingSink};
