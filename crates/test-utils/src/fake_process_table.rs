#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use niftymic_pipeline::exec::{ProcessEntry, ProcessTable};

#[derive(Debug)]
struct FakeProcess {
    entry: ProcessEntry,
    /// Kills still needed before the process disappears.
    kills_left: u32,
}

/// An in-memory process table.
///
/// Each process disappears after a configurable number of kill signals,
/// which lets tests model stubborn processes that need several passes.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessTable {
    processes: Arc<Mutex<Vec<FakeProcess>>>,
    kills: Arc<Mutex<HashMap<u32, u32>>>,
}

impl FakeProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process that dies on the first kill.
    pub fn spawn(&self, pid: u32, cmdline: &[&str]) {
        self.spawn_stubborn(pid, cmdline, 1);
    }

    /// Add a process that needs `kills` kill signals before it exits.
    pub fn spawn_stubborn(&self, pid: u32, cmdline: &[&str], kills: u32) {
        self.processes.lock().unwrap().push(FakeProcess {
            entry: ProcessEntry {
                pid,
                cmdline: cmdline.iter().map(|s| s.to_string()).collect(),
            },
            kills_left: kills,
        });
    }

    pub fn alive(&self) -> Vec<u32> {
        self.processes
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.entry.pid)
            .collect()
    }

    /// Number of kill signals sent to `pid`.
    pub fn kills_for(&self, pid: u32) -> u32 {
        self.kills.lock().unwrap().get(&pid).copied().unwrap_or(0)
    }
}

impl ProcessTable for FakeProcessTable {
    fn processes(&self) -> Result<Vec<ProcessEntry>> {
        Ok(self
            .processes
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.entry.clone())
            .collect())
    }

    fn kill(&self, pid: u32) -> Result<()> {
        *self.kills.lock().unwrap().entry(pid).or_insert(0) += 1;

        let mut procs = self.processes.lock().unwrap();
        if let Some(p) = procs.iter_mut().find(|p| p.entry.pid == pid) {
            p.kills_left = p.kills_left.saturating_sub(1);
        }
        procs.retain(|p| p.kills_left > 0);
        Ok(())
    }
}
