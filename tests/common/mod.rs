#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use niftymic_pipeline::fs::mock::MockFileSystem;
use niftymic_pipeline::fs::FileSystem;
use niftymic_pipeline::job::ReconstructionJob;
use niftymic_test_utils::builders::job_with;
use niftymic_test_utils::fake_runner::FakeRunner;

pub use niftymic_test_utils::init_tracing;

pub const ROOT: &str = "/data/job";

/// A job at [`ROOT`] on an in-memory filesystem, running through `runner`.
pub fn mock_job(fs: &MockFileSystem, inputs: &[&str], runner: Arc<FakeRunner>) -> ReconstructionJob {
    job_with(Path::new(ROOT), inputs, runner, Arc::new(fs.clone()))
}

/// A fake runner writing its outputs into `fs`.
pub fn fake_runner(fs: &MockFileSystem) -> FakeRunner {
    FakeRunner::new(Arc::new(fs.clone()) as Arc<dyn FileSystem>)
}
