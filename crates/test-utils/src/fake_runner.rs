#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use niftymic_pipeline::exec::{CommandRunner, CommandSpec, LogSink, RunFuture};
use niftymic_pipeline::fs::FileSystem;
use niftymic_pipeline::stages::toolset::{
    BIAS_FIELD_SUBCOMMAND, RECONSTRUCT_SUBCOMMAND, SEGMENT_SUBCOMMAND,
};

type Hook = Box<dyn Fn(&CommandSpec) + Send + Sync>;

/// A fake command runner that:
/// - records every command it is asked to run
/// - returns a scripted exit code per tool (default 0)
/// - on success, writes the files the real tool would have produced into
///   the given filesystem, so later stages can discover them.
///
/// Tools are keyed by [`tool_key`]: the container sub-command for
/// containerised tools, the program's file name for native ones.
pub struct FakeRunner {
    fs: Arc<dyn FileSystem>,
    executed: Arc<Mutex<Vec<CommandSpec>>>,
    exit_codes: HashMap<String, i32>,
    hooks: HashMap<String, Hook>,
}

impl FakeRunner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            executed: Arc::new(Mutex::new(Vec::new())),
            exit_codes: HashMap::new(),
            hooks: HashMap::new(),
        }
    }

    /// Make every invocation of `tool` exit with `code`.
    pub fn fail(mut self, tool: &str, code: i32) -> Self {
        self.exit_codes.insert(tool.to_string(), code);
        self
    }

    /// Call `hook` whenever `tool` runs (before it "exits").
    pub fn on_run(mut self, tool: &str, hook: impl Fn(&CommandSpec) + Send + Sync + 'static) -> Self {
        self.hooks.insert(tool.to_string(), Box::new(hook));
        self
    }

    /// Shared handle to the recorded commands.
    pub fn executed(&self) -> Arc<Mutex<Vec<CommandSpec>>> {
        Arc::clone(&self.executed)
    }

    /// Tool keys of every recorded command, in order.
    pub fn tools_run(&self) -> Vec<String> {
        self.executed.lock().unwrap().iter().map(tool_key).collect()
    }

    /// Recorded commands for `tool`.
    pub fn commands_for(&self, tool: &str) -> Vec<CommandSpec> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|c| tool_key(c) == tool)
            .cloned()
            .collect()
    }

    fn produce_outputs(&self, command: &CommandSpec) {
        match tool_key(command).as_str() {
            "dcm2niix" => {
                let dir = first_value(command, "-o");
                let name = first_value(command, "-f");
                self.touch(&dir.join(format!("{}.nii", name.display())));
            }
            SEGMENT_SUBCOMMAND => {
                let dir = first_value(command, "--dir-output");
                for image in command.values_of("--filenames") {
                    let stem = image_stem(Path::new(image));
                    self.touch(&dir.join(format!("{stem}_mask.nii.gz")));
                }
            }
            BIAS_FIELD_SUBCOMMAND | RECONSTRUCT_SUBCOMMAND => {
                self.touch(&first_value(command, "--output"));
            }
            "medcon" => {
                let dir = command.cwd.clone().expect("medcon runs inside the output directory");
                let volume = first_value(command, "-f");
                let stem = image_stem(&volume);
                for slice in 0..3 {
                    self.touch(&dir.join(format!("m{slice:03}-{stem}.dcm")));
                }
            }
            _ => {}
        }
    }

    fn touch(&self, path: &Path) {
        self.fs
            .write(path, b"fake")
            .unwrap_or_else(|e| panic!("fake tool failed to write {}: {e}", path.display()));
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> RunFuture<'a> {
        Box::pin(async move {
            {
                let mut guard = self.executed.lock().unwrap();
                guard.push(command.clone());
            }

            let key = tool_key(command);
            if let Some(hook) = self.hooks.get(&key) {
                hook(command);
            }

            let code = self.exit_codes.get(&key).copied().unwrap_or(0);
            if code == 0 {
                self.produce_outputs(command);
            }
            Ok(code)
        })
    }
}

/// Key identifying which tool a command launches.
pub fn tool_key(command: &CommandSpec) -> String {
    for sub in [SEGMENT_SUBCOMMAND, BIAS_FIELD_SUBCOMMAND, RECONSTRUCT_SUBCOMMAND] {
        if command.args.iter().any(|a| a == sub) {
            return sub.to_string();
        }
    }
    Path::new(&command.program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.program.clone())
}

fn first_value(command: &CommandSpec, flag: &str) -> PathBuf {
    command
        .values_of(flag)
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| panic!("`{command}` has no value for {flag}"))
}

fn image_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.trim_end_matches(".gz")
        .trim_end_matches(".nii")
        .to_string()
}

/// Log sink that keeps every line in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn append(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
