// src/exec/sink.rs

use tracing::info;

/// Destination for the output lines of external tools.
///
/// The process runner only needs "append a log line"; whatever displays the
/// text (terminal, log file, a GUI pane) lives behind this trait.
pub trait LogSink: Send + Sync {
    fn append(&self, line: &str);
}

/// Default sink: every line becomes an `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn append(&self, line: &str) {
        info!(target: "niftymic_pipeline::tool", "{}", line);
    }
}
